// Export projections of a sequence.
//
// `to_csv` flattens each segment into one comma-separated row under a header
// naming every field (`start,end,p1..p16,a1..a5,...,j1..j3`), for viewing a
// label file in a spreadsheet. It is write-only: nothing reads it back.
// `to_json` writes the segments with their named windows.

use crate::grammar::GROUPS;
use crate::sequence::Sequence;

/// Column names, in row order.
pub fn csv_header() -> Vec<String> {
    let mut header = vec!["start".to_string(), "end".to_string()];
    for group in GROUPS {
        header.extend((1..=group.arity()).map(|i| format!("{}{i}", group.name)));
    }
    header
}

/// Header row plus one row per segment, newline-terminated.
pub fn to_csv(sequence: &Sequence) -> String {
    let mut out = csv_header().join(",");
    out.push('\n');
    for seg in sequence {
        let mut row = vec![seg.start.to_string(), seg.end.to_string()];
        row.extend(seg.context_fields().into_iter().map(|f| f.to_string()));
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Pretty-printed JSON array of segments.
pub fn to_json(sequence: &Sequence) -> serde_json::Result<String> {
    serde_json::to_string_pretty(sequence.segments())
}
