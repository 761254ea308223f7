use planetfolio::{AppConfig, init_logging, run};

fn main() {
    init_logging();

    let result = AppConfig::load().and_then(run);
    if let Err(e) = result {
        tracing::error!(error = %e, "planetfolio exited with an error");
        std::process::exit(1);
    }
}
