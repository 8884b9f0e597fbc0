// [apps/telara-core/src/main.rs]
//! Thin process entry point: load settings, initialise tracing, ignite the
//! kernel (C11's startup order), run until a shutdown signal arrives.

use telara_core::config::Settings;
use telara_core::kernel::CoreKernel;
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load();
    telara_observability::init_tracing("telara_core");

    let bind_addr = format!("0.0.0.0:{}", settings.port).parse().expect("PORT yields a valid socket address");

    let kernel = match CoreKernel::ignite(settings).await {
        Ok(kernel) => kernel,
        Err(e) => {
            error!("fatal: could not ignite telara-core: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = kernel.run(bind_addr).await {
        error!("telara-core exited with error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}
