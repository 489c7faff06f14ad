use std::fs::File;
use std::future::Future;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustls::ServerConfig;
use rustls::pki_types::CertificateDer;

// Secret volume updates swap several files; give them time to settle.
const RELOAD_DELAY: Duration = Duration::from_secs(5);

pub fn load_tls_config(cert_path: &Path, key_path: &Path) -> anyhow::Result<ServerConfig> {
    let cert_file = File::open(cert_path)?;
    let key_file = File::open(key_path)?;

    let mut cert_reader = BufReader::new(cert_file);
    let mut key_reader = BufReader::new(key_file);

    let certs: Vec<CertificateDer> =
        rustls_pemfile::certs(&mut cert_reader).collect::<Result<Vec<_>, _>>()?;

    let key = rustls_pemfile::private_key(&mut key_reader)?
        .ok_or_else(|| anyhow::anyhow!("No private key found in key file"))?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

/// Directories to watch for certificate rotation.
///
/// Kubernetes mounts secrets through symlinks, so the parent directories are watched rather than
/// the files themselves.
fn watched_dirs(cert_path: &Path, key_path: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::with_capacity(2);
    for dir in [cert_path.parent(), key_path.parent()].into_iter().flatten() {
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        if !dirs.iter().any(|d| d == dir) {
            dirs.push(dir.to_path_buf());
        }
    }
    dirs
}

pub async fn watch_tls_files(
    cert_path: PathBuf,
    key_path: PathBuf,
    rustls_config: RustlsConfig,
) -> anyhow::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res {
            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) => {
                    // a full channel already has a reload queued
                    let _ = tx.try_send(());
                }
                _ => {}
            }
        }
    })?;

    for dir in watched_dirs(&cert_path, &key_path) {
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    }

    while rx.recv().await.is_some() {
        tokio::time::sleep(RELOAD_DELAY).await;

        match load_tls_config(&cert_path, &key_path) {
            Ok(new_config) => {
                rustls_config.reload_from_config(Arc::new(new_config));
                tracing::info!("Successfully reloaded TLS certificates");
            }
            Err(e) => {
                tracing::error!("Failed to load new TLS config: {}", e);
            }
        }
    }

    Ok(())
}

/// Drive `server` to completion while certificates are reloaded in the background.
///
/// A watcher that fails (missing directory, inotify limits) is logged and leaves the server
/// running on the certificates it already has.
pub async fn serve_with_reload<S>(
    server: S,
    cert_path: PathBuf,
    key_path: PathBuf,
    rustls_config: RustlsConfig,
) -> S::Output
where
    S: Future,
{
    let watcher = tokio::spawn(async move {
        if let Err(e) = watch_tls_files(cert_path, key_path, rustls_config).await {
            tracing::error!(
                "TLS certificate watcher stopped, certificates will not be reloaded: {}",
                e
            );
        }
    });

    let output = server.await;
    watcher.abort();
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use rustls::server::ResolvesServerCertUsingSni;

    fn empty_rustls_config() -> RustlsConfig {
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_cert_resolver(Arc::new(ResolvesServerCertUsingSni::new()));
        RustlsConfig::from_config(Arc::new(config))
    }

    #[test]
    fn test_watched_dirs_deduplicates_shared_parent() {
        let dirs = watched_dirs(
            Path::new("/etc/mutating-webhook/tls/tls.crt"),
            Path::new("/etc/mutating-webhook/tls/tls.key"),
        );
        assert_eq!(dirs, vec![PathBuf::from("/etc/mutating-webhook/tls")]);
    }

    #[test]
    fn test_watched_dirs_separate_parents() {
        let dirs = watched_dirs(Path::new("/certs/tls.crt"), Path::new("/keys/tls.key"));
        assert_eq!(dirs, vec![PathBuf::from("/certs"), PathBuf::from("/keys")]);
    }

    #[test]
    fn test_watched_dirs_relative_file() {
        let dirs = watched_dirs(Path::new("tls.crt"), Path::new("tls.key"));
        assert_eq!(dirs, vec![PathBuf::from(".")]);
    }

    #[test]
    fn test_load_tls_config_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_tls_config(&dir.path().join("tls.crt"), &dir.path().join("tls.key"));
        assert!(err.is_err());
    }

    #[test]
    fn test_load_tls_config_without_key() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("tls.crt");
        let key_path = dir.path().join("tls.key");
        File::create(&cert_path).unwrap();
        let mut key_file = File::create(&key_path).unwrap();
        writeln!(key_file, "not a pem block").unwrap();

        let err = load_tls_config(&cert_path, &key_path).unwrap_err();
        assert_eq!(err.to_string(), "No private key found in key file");
    }

    #[tokio::test]
    async fn test_watch_tls_files_fails_on_missing_dir() {
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            watch_tls_files(
                PathBuf::from("/nonexistent/tls.crt"),
                PathBuf::from("/nonexistent/tls.key"),
                empty_rustls_config(),
            ),
        )
        .await
        .expect("watcher returns without waiting for events");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_failed_watcher_keeps_server_running() {
        let (stop, stopped) = tokio::sync::oneshot::channel::<&str>();
        let serving = tokio::spawn(serve_with_reload(
            async move { stopped.await.unwrap() },
            PathBuf::from("/nonexistent/tls.crt"),
            PathBuf::from("/nonexistent/tls.key"),
            empty_rustls_config(),
        ));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!serving.is_finished());

        stop.send("stopped").unwrap();
        assert_eq!(serving.await.unwrap(), "stopped");
    }
}
