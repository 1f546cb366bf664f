//! Terminal rendering for command results.

use serde::Serialize;

use cyberlab_domain::{CatalogSummary, HtbStats, Record, ThmStats, Tool};
use cyberlab_service::{Aggregation, Notice, NoticeKind};

#[derive(Serialize)]
struct CatalogReport<'a> {
	summary: &'a CatalogSummary,
	advisory: Option<&'a str>,
	records: &'a [Record],
}

#[derive(Serialize)]
struct HomeReport<'a> {
	htb: &'a HtbStats,
	thm: &'a ThmStats,
	advisory: Option<&'a str>,
	recent: &'a [Record],
	tools: &'a [Tool],
}

pub fn catalog(
	json: bool,
	aggregation: &Aggregation,
	visible: &[Record],
	summary: &CatalogSummary,
) -> color_eyre::Result<()> {
	let advisory = aggregation.advisory.as_deref();

	if json {
		return print_json(&CatalogReport { summary, advisory, records: visible });
	}

	print_advisory(advisory);
	println!(
		"{} total | {} completed | {} in progress | easy {} / medium {} / hard {}",
		summary.total,
		summary.completed,
		summary.in_progress,
		summary.easy,
		summary.medium,
		summary.hard
	);

	for record in visible {
		println!("{}", record_line(record));
	}

	Ok(())
}

pub fn records(json: bool, records: &[Record]) -> color_eyre::Result<()> {
	if json {
		return print_json(&records);
	}
	if records.is_empty() {
		println!("Nothing completed yet.");
	}

	for record in records {
		println!("{}", record_line(record));
	}

	Ok(())
}

pub fn tools(json: bool, tools: &[Tool]) -> color_eyre::Result<()> {
	if json {
		return print_json(&tools);
	}
	if tools.is_empty() {
		println!("No tools available.");
	}

	for tool in tools {
		println!("{}", tool_line(tool));
	}

	Ok(())
}

pub fn home(
	json: bool,
	htb: &HtbStats,
	thm: &ThmStats,
	aggregation: &Aggregation,
	tools: &[Tool],
) -> color_eyre::Result<()> {
	let advisory = aggregation.advisory.as_deref();

	if json {
		return print_json(&HomeReport { htb, thm, advisory, recent: &aggregation.recent, tools });
	}

	println!(
		"HTB  {} | rank #{} | score {} | {} machines pwned (updated {})",
		htb.htb_rank, htb.global_ranking, htb.final_score, htb.machines_pwned, htb.last_updated
	);
	println!(
		"THM  {} | {} rooms | {} day streak | {} badges (updated {})",
		thm.thm_rank,
		thm.rooms_completed,
		thm.streak,
		thm.badges.len(),
		thm.last_updated
	);
	println!();
	print_advisory(advisory);
	println!("Recently completed:");

	for record in &aggregation.recent {
		println!("  {}", record_line(record));
	}

	println!();
	println!("Latest tools:");

	for tool in tools {
		println!("  {}", tool_line(tool));
	}

	Ok(())
}

pub fn notice(notice: &Notice) {
	let marker = match notice.kind {
		NoticeKind::Success => "ok",
		NoticeKind::Advisory => "warning",
		NoticeKind::Error => "error",
	};

	println!("[{marker}] {}", notice.message);
}

fn print_advisory(advisory: Option<&str>) {
	if let Some(advisory) = advisory {
		println!("[warning] {advisory}");
	}
}

fn record_line(record: &Record) -> String {
	let date = record.date_completed.as_deref().unwrap_or("-");
	let tags = if record.tags.is_empty() { String::new() } else { format!(" [{}]", record.tags.join(", ")) };

	format!(
		"{:<4} {:<10} {:<24} {:<8} {:<7} {:<12} {}{}",
		record.platform.to_string(),
		record.id,
		record.name,
		record.os.as_str(),
		record.difficulty.as_str(),
		record.status.as_str(),
		date,
		tags
	)
}

fn tool_line(tool: &Tool) -> String {
	let stars = tool.stars.map(|stars| format!(" {stars} stars")).unwrap_or_default();
	let updated = tool.last_updated.as_deref().or(tool.published_at.as_deref()).unwrap_or("-");

	format!("{} ({updated}){stars} {}", tool.name, tool.description)
}

fn print_json<T>(value: &T) -> color_eyre::Result<()>
where
	T: ?Sized + Serialize,
{
	println!("{}", serde_json::to_string_pretty(value)?);

	Ok(())
}
