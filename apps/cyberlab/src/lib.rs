pub mod output;
pub mod watch;

use std::{
	io::{self, Write},
	path::{Path, PathBuf},
	str::FromStr,
	sync::Arc,
};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use cyberlab_domain::{
	Choice, Criteria, Difficulty, Machine, NewMachine, Os, Snapshot, Status,
	tags::{self, TagSource},
};
use cyberlab_providers::CatalogClient;
use cyberlab_service::{
	AdminActions, AutoConfirm, CatalogService, Confirm, DeleteOutcome, NoticeKind, Providers,
	StatsEditor,
};
use cyberlab_storage::{FileStore, newsletter};

#[derive(Debug, Parser)]
#[command(
	version = cyberlab_cli::VERSION,
	rename_all = "kebab",
	styles = cyberlab_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Print JSON instead of text.
	#[arg(long, global = true)]
	pub json: bool,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Aggregated catalog, filtered.
	Catalog(CatalogArgs),
	/// Recently completed machines and rooms.
	Recent,
	/// Statistics, recently completed records, and the latest tools.
	Home,
	/// Homepage tools feed.
	Tools {
		/// Drop the cached feed first.
		#[arg(long)]
		refresh: bool,
	},
	Add(MachineArgs),
	Update {
		id: String,
		#[command(flatten)]
		machine: MachineArgs,
	},
	Delete {
		id: String,
		/// Skip the confirmation prompt.
		#[arg(long)]
		yes: bool,
	},
	/// Edit one statistics field and save it.
	Stats {
		#[arg(value_enum)]
		target: StatsTarget,
		field: String,
		value: String,
	},
	/// Run the refresh loops and report changes until interrupted.
	Watch,
	Newsletter {
		#[arg(value_enum, default_value_t = NewsletterAction::Status)]
		action: NewsletterAction,
	},
}

#[derive(Debug, clap::Args)]
pub struct CatalogArgs {
	#[arg(long, short = 's', default_value = "")]
	pub search: String,
	#[arg(long, default_value = "all")]
	pub os: Choice<Os>,
	#[arg(long, default_value = "all")]
	pub difficulty: Choice<Difficulty>,
	#[arg(long, default_value = "all")]
	pub status: Choice<Status>,
}
impl CatalogArgs {
	pub fn criteria(&self) -> Criteria {
		Criteria {
			search: self.search.clone(),
			os: self.os.clone(),
			difficulty: self.difficulty.clone(),
			status: self.status.clone(),
		}
	}
}

#[derive(Debug, clap::Args)]
pub struct MachineArgs {
	#[arg(long)]
	pub name: String,
	#[arg(long, default_value = "Linux")]
	pub os: Os,
	#[arg(long, default_value = "Easy")]
	pub difficulty: Difficulty,
	#[arg(long, default_value = "In Progress")]
	pub status: Status,
	/// Completion date, `YYYY-MM-DD` or RFC 3339.
	#[arg(long)]
	pub date: Option<String>,
	/// Comma-separated or JSON array.
	#[arg(long, default_value = "")]
	pub tags: String,
	#[arg(long)]
	pub writeup: Option<String>,
}
impl MachineArgs {
	pub fn into_new_machine(self) -> NewMachine {
		NewMachine {
			name: self.name.trim().to_string(),
			os: self.os,
			difficulty: self.difficulty,
			status: self.status,
			date_completed: self.date.filter(|date| !date.trim().is_empty()),
			tags: tags::normalize(TagSource::Text(self.tags)),
			writeup: self.writeup.filter(|writeup| !writeup.trim().is_empty()),
		}
	}

	pub fn into_machine(self, id: String) -> Machine {
		let new = self.into_new_machine();

		Machine {
			id,
			name: new.name,
			os: new.os,
			difficulty: new.difficulty,
			status: new.status,
			date_completed: new.date_completed,
			tags: new.tags,
			writeup: new.writeup,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatsTarget {
	Htb,
	Thm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NewsletterAction {
	Status,
	Close,
	Subscribe,
}

/// Reads a yes/no answer from stdin.
struct StdinConfirm;
impl Confirm for StdinConfirm {
	fn confirm(&self, prompt: &str) -> bool {
		print!("{prompt} [y/N] ");

		if io::stdout().flush().is_err() {
			return false;
		}

		let mut answer = String::new();

		if io::stdin().read_line(&mut answer).is_err() {
			return false;
		}

		matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = cyberlab_config::load(&args.config)?;

	init_tracing(&config);

	let store = Arc::new(FileStore::open(Path::new(&config.storage.state_path))?);
	let client = CatalogClient::new(&config)?;
	let service = Arc::new(CatalogService::new(config, store.clone(), Providers::http(client)));
	let json = args.json;

	match args.command {
		Command::Catalog(catalog) => {
			let aggregation = service.load_catalog().await;

			service.set_criteria(catalog.criteria());

			output::catalog(json, &aggregation, &service.visible(), &service.summary())
		},
		Command::Recent => {
			let aggregation = service.load_catalog().await;

			output::records(json, &aggregation.recent)
		},
		Command::Home => {
			let (_, aggregation, tools) =
				tokio::join!(service.refresh_stats(), service.load_catalog(), service.latest_tools());

			output::home(json, &service.htb_stats(), &service.thm_stats(), &aggregation, &tools)
		},
		Command::Tools { refresh } => {
			let tools =
				if refresh { service.refresh_tools().await } else { service.latest_tools().await };

			output::tools(json, &tools)
		},
		Command::Add(machine) => {
			let actions = admin(&service).await?;
			let created = actions.create(machine.into_new_machine()).await;

			settle(&service, created)
		},
		Command::Update { id, machine } => {
			service.load_catalog().await;

			let actions = admin(&service).await?;
			let updated = actions.update(machine.into_machine(id)).await;

			settle(&service, updated)
		},
		Command::Delete { id, yes } => {
			service.load_catalog().await;

			let actions = admin(&service).await?;
			let confirm: &dyn Confirm = if yes { &AutoConfirm } else { &StdinConfirm };

			match actions.delete(&id, confirm).await? {
				DeleteOutcome::Declined => {
					println!("Delete cancelled.");

					Ok(())
				},
				DeleteOutcome::Deleted | DeleteOutcome::Rejected => settle(&service, Ok(())),
			}
		},
		Command::Stats { target, field, value } => {
			service.refresh_stats().await;

			let actions = admin(&service).await?;

			match target {
				StatsTarget::Htb => edit_stat(&service, actions.htb_stats(), &field, &value).await,
				StatsTarget::Thm => edit_stat(&service, actions.thm_stats(), &field, &value).await,
			}
		},
		Command::Watch => watch::run(service, store).await,
		Command::Newsletter { action } => {
			match action {
				NewsletterAction::Status => {},
				NewsletterAction::Close =>
					newsletter::record(store.as_ref(), newsletter::PopupStatus::Closed)?,
				NewsletterAction::Subscribe =>
					newsletter::record(store.as_ref(), newsletter::PopupStatus::Submitted)?,
			}

			let show = newsletter::should_show(store.as_ref())?;

			println!("{}", if show { "Newsletter popup: shown" } else { "Newsletter popup: dismissed" });

			Ok(())
		},
	}
}

fn init_tracing(config: &cyberlab_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

async fn admin(service: &CatalogService) -> color_eyre::Result<AdminActions<'_>> {
	service.gate.check().await;

	service.require_admin().map_err(|err| {
		eyre::eyre!("{err} Set session.cookie to an authenticated session.")
	})
}

/// Prints the notice left by a mutation. Advisories are reported but do not fail the command.
fn settle<T>(service: &CatalogService, result: cyberlab_service::Result<T>) -> color_eyre::Result<()> {
	let notice = service.notices.current();

	if let Some(notice) = &notice {
		output::notice(notice);
	}

	match (result, notice.map(|notice| notice.kind)) {
		(Ok(_), Some(NoticeKind::Error)) => Err(eyre::eyre!("The store rejected the request.")),
		(Ok(_), _) | (Err(_), Some(NoticeKind::Advisory)) => Ok(()),
		(Err(err), _) => Err(err.into()),
	}
}

async fn edit_stat<S>(
	service: &CatalogService,
	editor: &StatsEditor<S>,
	field: &str,
	value: &str,
) -> color_eyre::Result<()>
where
	S: Snapshot,
	S::Field: FromStr<Err = cyberlab_domain::Error>,
{
	let field = field.parse::<S::Field>()?;
	let before = editor.edit_field(field)?;

	if let Err(err) = editor.set_draft(value) {
		editor.cancel_field();

		return Err(err.into());
	}

	let saved = editor.save_field().await;

	if saved.is_ok() {
		println!("{} {field}: {before} -> {value}", S::LABEL);
	}

	settle(service, saved)
}
