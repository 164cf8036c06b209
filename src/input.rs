/// Parse a URL list: one URL per line, surrounding whitespace trimmed.
///
/// Blank lines are skipped; everything else is kept in file order, so the
/// position of a URL in the returned list is its position in the batch.
/// Lines are not validated here; a malformed URL fails on its own when
/// fetched, without affecting the others.
pub fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
