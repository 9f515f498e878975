use api::Router;
use core::{convert::Infallible, str::FromStr, time::Duration};
use db::{Database, MemoryStore, Store};
use hyper::{server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use lifecycle::{Clock, Context, Settings, SystemClock};
use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tokio::{net::TcpListener, runtime::Runtime};

enum Backend {
    Postgres { user: String, pass: String, host: String, data: String, port: u16 },
    Memory,
}

struct Config {
    port: u16,
    backend: Backend,
    settings: Settings,
}

/// Reads an optional variable, falling back to `default` when it is unset.
fn var_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => Ok(value.parse()?),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err.into()),
    }
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")?.parse()?;
        let backend = match var_or("STORE", String::from("postgres"))?.as_str() {
            "postgres" => Backend::Postgres {
                user: env::var("PG_USERNAME")?,
                pass: env::var("PG_PASSWORD")?,
                host: env::var("PG_HOSTNAME")?,
                data: env::var("PG_DATABASE")?,
                port: var_or("PG_PORT", 5432)?,
            },
            "memory" => Backend::Memory,
            other => anyhow::bail!("unknown store backend {other:?}"),
        };

        let defaults = Settings::default();
        let reconcile_every = var_or("RECONCILE_INTERVAL_SECS", defaults.reconcile_every.as_secs())?;
        anyhow::ensure!(reconcile_every > 0, "reconcile interval must be positive");
        let store_timeout = var_or("STORE_TIMEOUT_MS", defaults.store_timeout.as_millis() as u64)?;
        anyhow::ensure!(store_timeout > 0, "store timeout must be positive");
        let settings = Settings {
            reconcile_every: Duration::from_secs(reconcile_every),
            store_timeout: Duration::from_millis(store_timeout),
        };

        Ok(Self { port, backend, settings })
    }
}

async fn serve<S: Store, C: Clock>(context: Context<S, C>, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, port).into();
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            context.shutdown().await;
            return Err(err.into());
        }
    };
    log::info!("Listening on {addr}.");

    let router = Arc::new(Router::new(context.service()));
    let stop = tokio::signal::ctrl_c();
    tokio::pin!(stop);

    let result = loop {
        let (stream, peer) = tokio::select! {
            biased;
            signal = &mut stop => break signal.map_err(anyhow::Error::from),
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    log::error!("Failed to accept a connection: {err}");
                    continue;
                }
            },
        };

        let router = router.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let router = router.clone();
                async move { Ok::<_, Infallible>(router.handle(req, peer.ip()).await) }
            });
            if let Err(err) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                log::warn!("Connection with {peer} ended abruptly: {err}");
            }
        });
    };

    log::info!("Shutting down.");
    drop(listener);
    drop(router);
    context.shutdown().await;
    result
}

async fn run(config: Config) -> anyhow::Result<()> {
    let Config { port, backend, settings } = config;
    match backend {
        Backend::Postgres { user, pass, host, data, port: pg_port } => {
            let (client, conn) = db::Config::new()
                .user(&user)
                .password(&pass)
                .host(&host)
                .dbname(&data)
                .port(pg_port)
                .connect(db::NoTls)
                .await?;
            let driver = tokio::spawn(async move {
                if let Err(err) = conn.await {
                    log::error!("Store connection failed: {err}");
                }
            });

            let db = Database::from(client);
            if let Err(err) = db.ensure_schema().await {
                driver.abort();
                return Err(err.into());
            }
            log::info!("Connected to PostgreSQL at {host}:{pg_port}.");
            serve(Context::start(db, SystemClock, settings).with_driver(driver), port).await
        }
        Backend::Memory => {
            log::warn!("Using the in-memory store. Quizzes will not survive a restart.");
            serve(Context::start(MemoryStore::new(), SystemClock, settings), port).await
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::from_env()?;
    let runtime = Runtime::new()?;
    runtime.block_on(run(config))
}
