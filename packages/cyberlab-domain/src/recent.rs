use crate::record::Record;

/// Completed records with a parseable completion date, newest first, capped at `limit`.
///
/// Records without a usable date are left out rather than reported.
pub fn recently_completed(records: &[Record], limit: usize) -> Vec<Record> {
	let mut dated: Vec<_> = records
		.iter()
		.filter_map(|record| record.completed_at().map(|at| (at, record)))
		.collect();

	dated.sort_by(|(a, _), (b, _)| b.cmp(a));

	dated.into_iter().take(limit).map(|(_, record)| record.clone()).collect()
}
