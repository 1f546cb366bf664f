use clap::Parser;

use cyberlab::{Args, Command, NewsletterAction, StatsTarget};
use cyberlab_domain::{Choice, Difficulty, Os, Status};

fn parse(args: &[&str]) -> Args {
	Args::try_parse_from(args).expect("arguments must parse")
}

#[test]
fn catalog_filters_default_to_all() {
	let args = parse(&["cyberlab", "-c", "cyberlab.toml", "catalog"]);
	let Command::Catalog(catalog) = args.command else {
		panic!("expected catalog command");
	};

	assert!(catalog.criteria().is_unfiltered());
}

#[test]
fn catalog_filters_parse_case_insensitively() {
	let args = parse(&[
		"cyberlab",
		"-c",
		"cyberlab.toml",
		"--json",
		"catalog",
		"--search",
		"smb",
		"--os",
		"windows",
		"--status",
		"in progress",
	]);
	let Command::Catalog(catalog) = args.command else {
		panic!("expected catalog command");
	};
	let criteria = catalog.criteria();

	assert!(args.json);
	assert_eq!(criteria.search, "smb");
	assert_eq!(criteria.os, Choice::Only(Os::Windows));
	assert_eq!(criteria.difficulty, Choice::All);
	assert_eq!(criteria.status, Choice::Only(Status::InProgress));
}

#[test]
fn add_normalizes_tags_and_blank_fields() {
	let args = parse(&[
		"cyberlab",
		"-c",
		"cyberlab.toml",
		"add",
		"--name",
		" Jerry ",
		"--difficulty",
		"easy",
		"--tags",
		"tomcat, war ,",
		"--writeup",
		" ",
	]);
	let Command::Add(machine) = args.command else {
		panic!("expected add command");
	};
	let machine = machine.into_new_machine();

	assert_eq!(machine.name, "Jerry");
	assert_eq!(machine.os, Os::Linux);
	assert_eq!(machine.difficulty, Difficulty::Easy);
	assert_eq!(machine.status, Status::InProgress);
	assert_eq!(machine.tags, vec!["tomcat", "war"]);
	assert_eq!(machine.writeup, None);
}

#[test]
fn delete_and_stats_arguments() {
	let args = parse(&["cyberlab", "-c", "cyberlab.toml", "delete", "m1", "--yes"]);

	assert!(matches!(args.command, Command::Delete { ref id, yes: true } if id == "m1"));

	let args = parse(&["cyberlab", "-c", "cyberlab.toml", "stats", "htb", "final_score", "900"]);

	assert!(matches!(
		args.command,
		Command::Stats { target: StatsTarget::Htb, ref field, ref value }
			if field == "final_score" && value == "900"
	));
}

#[test]
fn newsletter_defaults_to_status() {
	let args = parse(&["cyberlab", "-c", "cyberlab.toml", "newsletter"]);

	assert!(matches!(args.command, Command::Newsletter { action: NewsletterAction::Status }));
	assert!(Args::try_parse_from(["cyberlab", "newsletter"]).is_err());
}
