use std::path::PathBuf;
use std::time::Instant;
use std::{env, fs, process};

use yeast_base::{YeastBase, ProvisionParams, RegionJoin};
use yeast_base::{utils, DatabaseFileType};

use getopts::Options;
use log::{info, Level};
use simple_logger::init_with_level;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new();
    let level = if config.verbose { Level::Debug } else { Level::Info };
    init_with_level(level).map_err(|x| x.to_string())?;

    // Check if the database already exists.
    if utils::file_exists(&config.db_file) {
        if config.overwrite {
            if yeast_base::identify_database(&config.db_file) == DatabaseFileType::NotDatabase {
                return Err(format!("Refusing to overwrite {}: not a database", config.db_file.display()));
            }
            info!("Overwriting database {}", config.db_file.display());
            fs::remove_file(&config.db_file).map_err(|x| x.to_string())?;
        } else {
            return Err(format!("Database {} already exists", config.db_file.display()));
        }
    }

    // Create the database.
    let stats = YeastBase::create_from_dir(&config.resource_dir, &config.db_file, &config.params)
        .map_err(|x| x.to_string())?;

    // Statistics.
    let database = YeastBase::open(&config.db_file).map_err(|x| x.to_string())?;
    eprintln!(
        "The database contains {} chromosomes, {} background events, and {} regions",
        database.chromosomes(), database.background_events(), database.regions()
    );
    if stats.total() != database.chromosomes() + database.background_events() + database.regions() {
        return Err(String::from("Row counts in the database do not match the loaded datasets"));
    }
    let aggregates = database.region_background_agg().map_err(|x| x.to_string())?;
    let totals = database.total_bg_hops().map_err(|x| x.to_string())?;
    eprintln!(
        "View region_background_agg has {} rows; total_bg_hops has {} background samples",
        aggregates.len(), totals.len()
    );
    let size = database.file_size().unwrap_or(String::from("unknown"));
    eprintln!("Final database size: {}", size);

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub resource_dir: PathBuf,
    pub db_file: PathBuf,
    pub params: ProvisionParams,
    pub overwrite: bool,
    pub verbose: bool,
}

impl Config {
    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("o", "output", "output file name (default: yeast.db)", "FILE");
        opts.optflag("", "overwrite", "overwrite the database file if it exists");
        opts.optflag("", "keep-unmatched", "report regions without background hits with zero hops");
        opts.optflag("", "enforce-foreign-keys", "reject rows referring to unknown chromosomes");
        opts.optflag("v", "verbose", "print debug messages");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] RESOURCE_DIR", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }

        let resource_dir = if let Some(s) = matches.free.first() {
            PathBuf::from(s)
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };
        let db_file = PathBuf::from(matches.opt_str("o").unwrap_or(String::from("yeast.db")));

        let mut params = ProvisionParams::default();
        if matches.opt_present("keep-unmatched") {
            params.join = RegionJoin::KeepUnmatched;
        }
        if matches.opt_present("enforce-foreign-keys") {
            params.enforce_foreign_keys = true;
        }

        Config {
            resource_dir,
            db_file,
            params,
            overwrite: matches.opt_present("overwrite"),
            verbose: matches.opt_present("verbose"),
        }
    }
}

//-----------------------------------------------------------------------------
