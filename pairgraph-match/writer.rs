use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use pairgraph_core::{PairwiseMatching, TwoViewMatching};

use crate::error::{MatchError, MatchResult};

/// Serialize retained pairs in scheduler order. Per pair: one
/// `viewId1 viewId2` line, one match-count line, then one
/// `queryIdx trainIdx` line per correspondence. No trailing metadata.
pub fn write_matches<W: Write>(out: &mut W, matching: &PairwiseMatching) -> std::io::Result<()> {
    for record in matching {
        writeln!(out, "{} {}", record.view_1_id, record.view_2_id)?;
        writeln!(out, "{}", record.matches.len())?;
        for (query_idx, train_idx) in &record.matches {
            writeln!(out, "{} {}", query_idx, train_idx)?;
        }
    }
    Ok(())
}

pub fn write_matches_file(path: &Path, matching: &PairwiseMatching) -> MatchResult<()> {
    let file = std::fs::File::create(path).map_err(|source| MatchError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    write_matches(&mut out, matching)?;
    out.flush()?;
    Ok(())
}

/// Parse a matches stream written by [`write_matches`].
pub fn read_matches<R: BufRead>(input: R) -> MatchResult<PairwiseMatching> {
    let mut matching = PairwiseMatching::new();
    let mut lines = input.lines().enumerate();

    let mut next_line = |expected: &str| -> MatchResult<Option<(usize, String)>> {
        match lines.next() {
            None => Ok(None),
            Some((n, Ok(line))) => {
                if line.trim().is_empty() {
                    Err(MatchError::Parse {
                        line: n + 1,
                        message: format!("empty line where {} expected", expected),
                    })
                } else {
                    Ok(Some((n + 1, line)))
                }
            }
            Some((_, Err(e))) => Err(MatchError::Io(e)),
        }
    };

    while let Some((line_no, header)) = next_line("pair header")? {
        let ids: Vec<&str> = header.split_whitespace().collect();
        let parse_u32 = |token: &str, line: usize| -> MatchResult<u32> {
            token.parse().map_err(|_| MatchError::Parse {
                line,
                message: format!("bad integer {:?}", token),
            })
        };
        if ids.len() != 2 {
            return Err(MatchError::Parse {
                line: line_no,
                message: "pair header needs two view ids".into(),
            });
        }
        let mut record = TwoViewMatching {
            view_1_id: parse_u32(ids[0], line_no)?,
            view_2_id: parse_u32(ids[1], line_no)?,
            matches: Vec::new(),
        };

        let (count_line_no, count_line) =
            next_line("match count")?.ok_or_else(|| MatchError::Parse {
                line: line_no,
                message: "missing match count".into(),
            })?;
        let count: usize = count_line.trim().parse().map_err(|_| MatchError::Parse {
            line: count_line_no,
            message: format!("bad match count {:?}", count_line),
        })?;

        for _ in 0..count {
            let (n, line) = next_line("correspondence")?.ok_or_else(|| MatchError::Parse {
                line: count_line_no,
                message: "truncated correspondence list".into(),
            })?;
            let idx: Vec<&str> = line.split_whitespace().collect();
            if idx.len() != 2 {
                return Err(MatchError::Parse {
                    line: n,
                    message: "correspondence needs two indices".into(),
                });
            }
            record
                .matches
                .push((parse_u32(idx[0], n)?, parse_u32(idx[1], n)?));
        }
        matching.push(record);
    }
    Ok(matching)
}

pub fn read_matches_file(path: &Path) -> MatchResult<PairwiseMatching> {
    let file = std::fs::File::open(path).map_err(|source| MatchError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    read_matches(BufReader::new(file))
}
