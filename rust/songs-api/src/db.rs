use crate::config::{AppConfig, TlsSettings};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bb8::{ManageConnection, Pool};
use diesel_async::{AsyncPgConnection, SimpleAsyncConnection};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use rustls_pemfile::certs;
use std::fs::File;
use std::io::BufReader;
use tokio_postgres::{Config as PgConfig, NoTls};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{error, info};

pub type PgPool = Pool<PgConnectionManager>;

pub async fn connect_pool(config: &AppConfig) -> Result<PgPool> {
    let manager = PgConnectionManager::from_config(config)?;
    let pool = Pool::builder()
        .max_size(config.max_pool_size)
        .build(manager)
        .await
        .context("failed to build PostgreSQL connection pool")?;

    // Report bad credentials at boot rather than on the first request.
    match pool.get().await {
        Ok(_) => info!("database connectivity check succeeded"),
        Err(err) => error!(error = ?err, "initial database connectivity check failed"),
    }

    Ok(pool)
}

/// Builds a pool without opening any connection up front.
pub fn lazy_pool(config: &AppConfig) -> Result<PgPool> {
    let manager = PgConnectionManager::from_config(config)?;
    Ok(Pool::builder()
        .max_size(config.max_pool_size)
        .connection_timeout(config.request_timeout)
        .build_unchecked(manager))
}

#[derive(Clone)]
pub struct PgConnectionManager {
    config: PgConfig,
    tls: PgTls,
}

#[derive(Clone)]
enum PgTls {
    None,
    Rustls(MakeRustlsConnect),
}

impl PgConnectionManager {
    fn from_config(config: &AppConfig) -> Result<Self> {
        let pg = config.database.pg_config()?;
        let tls = match config.tls.root_cert.as_deref() {
            Some(root_cert) => PgTls::Rustls(build_tls_connector(root_cert, &config.tls)?),
            None => PgTls::None,
        };
        Ok(Self { config: pg, tls })
    }
}

#[async_trait]
impl ManageConnection for PgConnectionManager {
    type Connection = AsyncPgConnection;
    type Error = anyhow::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let config = self.config.clone();
        match &self.tls {
            PgTls::None => {
                let (client, connection) = config.connect(NoTls).await?;
                AsyncPgConnection::try_from_client_and_connection(client, connection)
                    .await
                    .map_err(|err| anyhow::anyhow!(err))
            }
            PgTls::Rustls(connector) => {
                let (client, connection) = config.connect(connector.clone()).await?;
                AsyncPgConnection::try_from_client_and_connection(client, connection)
                    .await
                    .map_err(|err| anyhow::anyhow!(err))
            }
        }
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.batch_execute("SELECT 1").await?;
        Ok(())
    }

    fn has_broken(&self, _: &mut Self::Connection) -> bool {
        false
    }
}

fn build_tls_connector(root_cert: &str, tls: &TlsSettings) -> Result<MakeRustlsConnect> {
    let mut root_store = RootCertStore::empty();
    for cert in certs(&mut pem_reader(root_cert, "PGSSLROOTCERT")?) {
        let cert = cert.context("failed to parse PGSSLROOTCERT")?;
        root_store
            .add(cert)
            .map_err(|_| anyhow::anyhow!("invalid certificate in PGSSLROOTCERT"))?;
    }

    let builder = ClientConfig::builder().with_root_certificates(root_store);
    let client_config = match (tls.client_cert.as_deref(), tls.client_key.as_deref()) {
        (None, None) => builder.with_no_client_auth(),
        (Some(cert), Some(key)) => builder
            .with_client_auth_cert(load_client_certs(cert)?, load_client_key(key)?)
            .with_context(|| format!("failed to build client TLS config for {root_cert}"))?,
        _ => anyhow::bail!("PGSSLCERT and PGSSLKEY must both be set (or neither)"),
    };

    Ok(MakeRustlsConnect::new(client_config))
}

fn pem_reader(path: &str, var: &str) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("failed to open {var} file '{path}'"))?;
    Ok(BufReader::new(file))
}

fn load_client_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let chain = certs(&mut pem_reader(path, "PGSSLCERT")?)
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to parse PGSSLCERT")?;
    if chain.is_empty() {
        anyhow::bail!("PGSSLCERT contained no certificates");
    }
    Ok(chain)
}

fn load_client_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    rustls_pemfile::private_key(&mut pem_reader(path, "PGSSLKEY")?)
        .context("failed to parse PGSSLKEY")?
        .context("PGSSLKEY contained no private keys")
}
