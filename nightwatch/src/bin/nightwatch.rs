use chrono::Utc;
use nightwatch::ephemeris::SatkitEphemeris;
use nightwatch::output::write_report;
use nightwatch::reference::{ReferenceProvider, RemoteReference, StaticReference};
use nightwatch::satellite::Sgp4Tracker;
use nightwatch::tle::TleCache;
use nightwatch::weather::OpenMeteoClient;
use nightwatch::{Config, NightwatchResult, ReportAssembler};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> NightwatchResult<()> {
    let config = Config::load_or_default()?;
    let tz = config.location.timezone()?;
    // `nightwatch [output.json]`
    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.output_path.clone());

    let weather = OpenMeteoClient::new(config.weather_url.clone());
    let ephemeris = SatkitEphemeris;
    let tle_cache = TleCache::in_data_dir().unwrap_or_else(|e| {
        log::warn!("{e}; caching TLEs in the temp directory");
        TleCache::at(std::env::temp_dir().join("nightwatch"))
    });
    let tracker = Sgp4Tracker::new(tle_cache, config.pass_min_altitude_deg);
    let reference: Box<dyn ReferenceProvider> = match &config.reference_url {
        Some(url) => Box::new(RemoteReference::new(url.clone())),
        None => Box::new(StaticReference),
    };

    let assembler = ReportAssembler::new(
        &config,
        &weather,
        &ephemeris,
        &tracker,
        reference.as_ref(),
    );
    let report = assembler.assemble(Utc::now().with_timezone(&tz));
    write_report(&output_path, &report)
}
