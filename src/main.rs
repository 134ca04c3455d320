use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::PathBuf;

use musync::callbacks::CallbackBuilder;
use musync::client::{CatalogClient, CatalogRemote};
use musync::config::Config;
use musync::error::{ClientError, MusyncError};
use musync::logging::{self, error};
use musync::reconcile::Reconciler;
use musync::serve::Server;
use musync::strategies::FailurePolicy;
use musync::validation::Validator;

fn local_arg() -> Arg {
	Arg::new("local")
		.short('l')
		.long("local")
		.value_name("DIR")
		.help("Music directory (overrides the configured root)")
}

/// Matches holding the global flags, wherever they were given
///
/// Global args propagate down only, so the subcommand sees all of them.
fn effective_matches(matches: &ArgMatches) -> &ArgMatches {
	matches.subcommand().map(|(_, sub)| sub).unwrap_or(matches)
}

/// Defaults < config file < environment < command line
fn build_config(matches: &ArgMatches) -> Result<Config, MusyncError> {
	let path = matches.get_one::<String>("config").map(PathBuf::from);
	let mut config = Config::load_or_default(path.as_deref())?;
	config.apply_env()?;

	if let Some(host) = matches.get_one::<String>("host") {
		config.server.host = host.clone();
		config.client.host = host.clone();
	}
	if let Some(port) = matches.get_one::<u16>("port") {
		config.server.port = *port;
		config.client.port = *port;
	}
	if let Ok(Some(dir)) = matches.try_get_one::<String>("local") {
		config.server.root = PathBuf::from(dir);
		config.client.root = PathBuf::from(dir);
	}
	if let Ok(Some(true)) = matches.try_get_one::<bool>("fail-fast") {
		config.client.failure_policy = FailurePolicy::FailFast;
	}

	config.validate()?;
	Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = Command::new("musync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Audio catalog server and synchronizing client")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.global(true)
				.help("Config file (TOML, or JSON5 with a .json/.json5 extension)"),
		)
		.arg(Arg::new("host").long("host").value_name("HOST").global(true).help("Server host"))
		.arg(
			Arg::new("port")
				.short('p')
				.long("port")
				.value_name("PORT")
				.global(true)
				.value_parser(value_parser!(u16))
				.help("Server port"),
		)
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.global(true)
				.action(ArgAction::Count)
				.help("More logging (-v debug, -vv trace)"),
		)
		.subcommand(Command::new("serve").about("Serve the music directory").arg(local_arg()))
		.subcommand(
			Command::new("available").about("Print the numbered server catalog").arg(local_arg()),
		)
		.subcommand(Command::new("raw-available").about("Print server catalog names"))
		.subcommand(
			Command::new("copy")
				.about("Download one catalog entry")
				.arg(
					Arg::new("position")
						.required(true)
						.value_parser(value_parser!(usize))
						.help("1-based catalog position"),
				)
				.arg(local_arg()),
		)
		.subcommand(
			Command::new("diff").about("Print catalog entries missing locally").arg(local_arg()),
		)
		.subcommand(
			Command::new("automatic")
				.about("Download every catalog entry missing locally")
				.arg(local_arg())
				.arg(
					Arg::new("fail-fast")
						.long("fail-fast")
						.action(ArgAction::SetTrue)
						.help("Stop at the first failed copy"),
				),
		)
		.get_matches();

	run(&matches).await?;
	Ok(())
}

async fn run(matches: &ArgMatches) -> Result<(), MusyncError> {
	let flags = effective_matches(matches);
	let config = build_config(flags)?;
	logging::init_tracing(&logging::verbosity_level(&config.log_level, flags.get_count("verbose")));

	match matches.subcommand() {
		Some(("serve", _)) => {
			let server = Server::bind(&config.server).await?;
			server
				.run_until(async {
					if let Err(e) = tokio::signal::ctrl_c().await {
						error!("Cannot listen for Ctrl-C: {}", e);
					}
				})
				.await?;
		}
		Some(("available", _)) => {
			let client = CatalogClient::new(&config.client)?;
			let lines = client.available().await?;
			if lines.is_empty() {
				println!("There is no music on the server");
			}
			for line in lines {
				println!("{}", line);
			}
		}
		Some(("raw-available", _)) => {
			let mut client = CatalogClient::new(&config.client)?;
			match client.raw_available().await {
				Ok(names) => names.iter().for_each(|name| println!("{}", name)),
				Err(ClientError::EmptyCatalog) => println!("There is no music on the server"),
				Err(e) => return Err(e.into()),
			}
		}
		Some(("copy", sub)) => {
			let position = *sub
				.get_one::<usize>("position")
				.ok_or_else(|| "copy: position required".to_string())?;
			let mut client = CatalogClient::new(&config.client)?;
			let name = client.copy(position).await?;
			println!("Music {} created", name);
		}
		Some(("diff", _)) => {
			let mut client = CatalogClient::new(&config.client)?;
			let missing = Reconciler::new(config.client.failure_policy).plan(&mut client).await?;
			for (position, name) in missing {
				println!("{} -> {}", position, name);
			}
		}
		Some(("automatic", _)) => {
			let mut client = CatalogClient::new(&config.client)?;
			let callback = CallbackBuilder::new()
				.on_file_copied(|name| println!("Music {} created", name))
				.on_file_failed(|name, e| eprintln!("Music {} failed: {}", name, e))
				.build();
			let report = Reconciler::new(config.client.failure_policy)
				.with_callback(callback)
				.automatic(&mut client)
				.await?;
			if !report.is_complete() {
				return Err(format!(
					"{} copies failed, {} skipped",
					report.failed.len(),
					report.skipped.len()
				)
				.into());
			}
		}
		_ => return Err("unknown subcommand".to_string().into()),
	}

	Ok(())
}

// vim: ts=4
