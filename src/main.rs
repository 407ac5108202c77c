use log::error;
use ndeploy_install::Cli;

fn main() {
    // warn by default, RUST_LOG raises verbosity
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        })
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let cli = Cli::parse_args();
    if let Err(e) = rt.block_on(ndeploy_install::run(&cli)) {
        error!("{e:#}");
        eprintln!("[ERROR] provisioning aborted: {e}");
        std::process::exit(1);
    }
}
