use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use chrono::Datelike;
use rcgen::{CertificateParams, DnType, ExtendedKeyUsagePurpose, KeyPair, SanType};

/// Make sure a certificate and key exist at the given paths, generating a
/// self-signed localhost pair when either is missing.
pub fn ensure_cert(cert_path: &Path, key_path: &Path) -> anyhow::Result<()> {
    if cert_path.exists() && key_path.exists() {
        tracing::info!("TLS certificate found at {}", cert_path.display());
        return Ok(());
    }

    for parent in [cert_path.parent(), key_path.parent()].into_iter().flatten() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!("Generating self-signed TLS certificate at {}", cert_path.display());
    let (cert_pem, key_pem) = generate_self_signed()?;
    std::fs::write(cert_path, cert_pem)?;
    std::fs::write(key_path, key_pem)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(key_path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Self-signed certificate for localhost, valid until two years from now.
fn generate_self_signed() -> anyhow::Result<(String, String)> {
    let mut params = CertificateParams::default();
    params
        .distinguished_name
        .push(DnType::CommonName, "Forum Local Server");

    let today = chrono::Utc::now().date_naive();
    params.not_before = rcgen::date_time_ymd(today.year(), today.month() as u8, 1);
    params.not_after = rcgen::date_time_ymd(today.year() + 2, today.month() as u8, 1);
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.subject_alt_names = vec![
        SanType::DnsName("localhost".try_into()?),
        SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)),
    ];

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    Ok((cert.pem(), key_pair.serialize_pem()))
}

/// Load the PEM pair into an axum-server RustlsConfig.
pub async fn load_rustls_config(
    cert_path: &Path,
    key_path: &Path,
) -> anyhow::Result<axum_server::tls_rustls::RustlsConfig> {
    let config =
        axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
    Ok(config)
}
