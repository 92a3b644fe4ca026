pub mod error;
pub mod handlers;

use std::sync::Arc;

use actix_web::{
    dev::ServerHandle,
    error::Error,
    get,
    web::{self, Data},
    App, HttpResponse, HttpServer, Responder,
};
use anyhow::Context;
use log::{info, warn};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use rand::RngCore;
use sika_common::{
    config,
    tokio::{spawn_task, sync::Mutex},
};

use crate::{
    config::RpcConfig,
    core::{ledger::Ledger, storage::LedgerStorage},
};

pub use error::ApiError;

pub type SharedLedgerRpcServer<S> = Arc<LedgerRpcServer<S>>;

/// Shared secret authenticating payout gateway callbacks.
pub struct GatewayAuth {
    secret: Vec<u8>,
}

impl GatewayAuth {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

pub struct LedgerRpcServer<S: LedgerStorage> {
    handle: Mutex<Option<ServerHandle>>,
    ledger: Arc<Ledger<S>>,
}

impl<S: LedgerStorage> LedgerRpcServer<S> {
    pub async fn new(
        ledger: Arc<Ledger<S>>,
        config: RpcConfig,
    ) -> anyhow::Result<SharedLedgerRpcServer<S>> {
        let server = Arc::new(Self {
            handle: Mutex::new(None),
            ledger: Arc::clone(&ledger),
        });

        let prometheus = if config.prometheus_enable {
            let (recorder, _) = PrometheusBuilder::new()
                .build()
                .context("Failed to create Prometheus handler")?;

            let handle = recorder.handle();
            metrics::set_global_recorder(Box::new(recorder))
                .context("Failed to set global recorder for Prometheus")?;

            if log::log_enabled!(log::Level::Info) {
                info!(
                    "Prometheus metrics enabled on route: {}",
                    config.prometheus_route
                );
            }
            Some((config.prometheus_route, handle))
        } else {
            None
        };

        let auth = Data::new(GatewayAuth::new(gateway_secret(
            config.payout_gateway_secret,
        )));

        // SECURITY WARNING: Check if the API is exposed to network
        if config.rpc_bind_address.starts_with("0.0.0.0") {
            warn!("⚠️  SECURITY WARNING: API server is bound to 0.0.0.0 (all interfaces)");
            warn!(
                "⚠️  This exposes operator endpoints to the network WITHOUT authentication!"
            );
            warn!("⚠️  Attackers can:");
            warn!("⚠️    - Approve or reject pending withdrawals");
            warn!("⚠️    - Activate investments and credit rewards");
            warn!("⚠️    - Cause DoS via resource exhaustion");
            warn!("⚠️  ");
            warn!("⚠️  RECOMMENDED: Use 127.0.0.1:8080 for localhost-only access");
            warn!("⚠️  If remote access is required, use a firewall to restrict access");
            warn!("⚠️  ");
        }

        if log::log_enabled!(log::Level::Info) {
            info!("Starting API server on {}", config.rpc_bind_address);
        }

        {
            let builder = HttpServer::new(move || {
                let mut app = App::new()
                    .app_data(web::Data::from(Arc::clone(&ledger)))
                    .app_data(auth.clone())
                    .app_data(web::Data::new(
                        prometheus.as_ref().map(|(_, handle)| handle.clone()),
                    ))
                    .route(
                        "/accruals/video-watch",
                        web::post().to(handlers::credit_video_watch::<S>),
                    )
                    .route("/withdrawals", web::post().to(handlers::submit_withdrawal::<S>))
                    .route(
                        "/withdrawals/pending",
                        web::get().to(handlers::get_pending_withdrawals::<S>),
                    )
                    .route(
                        "/withdrawals/{id}/decision",
                        web::post().to(handlers::decide_withdrawal::<S>),
                    )
                    .route(
                        "/payouts/callback",
                        web::post().to(handlers::payout_callback::<S>),
                    )
                    .route(
                        "/investments/activations",
                        web::post().to(handlers::activate_investment::<S>),
                    )
                    .route(
                        "/investments/{id}",
                        web::get().to(handlers::get_investment::<S>),
                    )
                    .route(
                        "/investments/{id}/status",
                        web::post().to(handlers::set_investment_status::<S>),
                    )
                    .route(
                        "/investments/{id}/withdrawals",
                        web::get().to(handlers::get_investment_withdrawals::<S>),
                    )
                    .route("/referrals/bind", web::post().to(handlers::bind_referrer::<S>))
                    .route(
                        "/users/{user}/investments",
                        web::get().to(handlers::get_user_investments::<S>),
                    )
                    .route(
                        "/users/{user}/daily-quota",
                        web::get().to(handlers::daily_stats::<S>),
                    )
                    .route(
                        "/users/{user}/rewards",
                        web::get().to(handlers::get_user_rewards::<S>),
                    )
                    .route("/health", web::get().to(handlers::health))
                    .service(index);

                if let Some((route, _)) = &prometheus {
                    app = app.route(route, web::get().to(prometheus_metrics));
                }
                app
            })
            .disable_signals()
            .bind(&config.rpc_bind_address)?;

            let http_server = builder.workers(config.rpc_threads).run();

            {
                // save the server handle to be able to stop it later
                let handle = http_server.handle();
                let mut lock = server.handle.lock().await;
                *lock = Some(handle);
            }
            spawn_task("rpc-server", http_server);
        }

        Ok(server)
    }

    pub fn ledger(&self) -> &Arc<Ledger<S>> {
        &self.ledger
    }

    pub async fn stop(&self) {
        info!("Stopping API Server...");
        let mut handle = self.handle.lock().await;
        if let Some(handle) = handle.take() {
            handle.stop(false).await;
            info!("API Server is now stopped!");
        } else {
            warn!("API Server is not running!");
        }
    }
}

// A missing secret still verifies against something so the callback path
// behaves the same in dev; a real gateway will simply never match it.
fn gateway_secret(configured: Option<String>) -> Vec<u8> {
    match configured {
        Some(secret) => secret.into_bytes(),
        None => {
            warn!("No payout gateway secret configured, using an ephemeral random secret");
            warn!("Gateway callbacks will be rejected until --payout-gateway-secret is set");
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            bytes.to_vec()
        }
    }
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body(format!("Hello, world!\nRunning on: {}", config::VERSION))
}

async fn prometheus_metrics(handle: Data<Option<PrometheusHandle>>) -> Result<HttpResponse, Error> {
    Ok(match handle.as_ref() {
        Some(handle) => {
            let metrics = handle.render();
            HttpResponse::Ok()
                .content_type("text/plain; version=0.0.4")
                .body(metrics)
        }
        None => HttpResponse::NotFound().body("Prometheus metrics are not enabled"),
    })
}
