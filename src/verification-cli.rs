//! Offline auditing of an election's vote ledger.
//! Reads the JSON dump served by the backend and re-derives every hash with
//! the same code the server uses, so the two can never disagree on format.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use ivoting_backend::model::{
    common::{CandidateId, Position},
    tally::{LedgerDump, Tally},
};

const PROGRAM_NAME: &str = "verify-ledger";

const ABOUT_TEXT: &str = "Verify the hash chain of an election and count its votes.

EXIT CODES:
     0: Verification succeeded.
   255: Ran successfully, but verification failed.
 Other: Error.";

const DUMP_PATH: &str = "DUMP_PATH";

const DUMP_PATH_HELP: &str = "The path to a JSON dump of an election,\n\
as returned by `GET /elections/<election_id>/dump`";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME).about(ABOUT_TEXT).arg(
        Arg::new(DUMP_PATH)
            .help(DUMP_PATH_HELP)
            .action(ArgAction::Set)
            .required(true),
    )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump.
    Format(String),
    /// The chain breaks at this record.
    Chain { position: Position },
    /// A record's candidate isn't on the roster.
    UnknownCandidate {
        position: Position,
        candidate_id: CandidateId,
    },
}

/// One line of the printed results.
#[derive(Debug, Eq, PartialEq)]
struct FriendlyResults {
    pub candidate_name: String,
    pub votes: u64,
}

impl Display for FriendlyResults {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} vote{}",
            self.candidate_name,
            self.votes,
            if self.votes != 1 { "s" } else { "" }
        )
    }
}

/// Run verification.
fn verify(path: &str) -> Result<Vec<FriendlyResults>, Error> {
    // Load the file.
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let dump: LedgerDump =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    // Check the chain.
    let results = match dump.tally() {
        Tally::Counted(results) => results,
        Tally::ChainCompromised { position } => return Err(Error::Chain { position }),
    };
    if let Some(record) = dump
        .records
        .iter()
        .find(|record| dump.election.candidate(record.candidate_id).is_none())
    {
        return Err(Error::UnknownCandidate {
            position: record.position,
            candidate_id: record.candidate_id,
        });
    }

    // Most votes first, then by name.
    let mut results_list = dump
        .election
        .candidates
        .iter()
        .map(|candidate| FriendlyResults {
            candidate_name: candidate.name.clone(),
            votes: results.votes_for(candidate.id),
        })
        .collect::<Vec<_>>();
    results_list.sort_unstable_by(|a, b| a.candidate_name.cmp(&b.candidate_name));
    results_list.sort_by(|a, b| b.votes.cmp(&a.votes));

    Ok(results_list)
}

/// Run verification, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let Some(path) = args.get_one::<String>(DUMP_PATH) else {
        println!("No dump path given");
        return 1;
    };
    match verify(path) {
        Ok(friendly_results) => {
            println!("Verification succeeded.");
            for result in friendly_results {
                println!("{result}");
            }
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {msg}");
            1
        }
        Err(Error::Chain { position }) => {
            println!("Verification failed: the chain is broken at record {position}.");
            255
        }
        Err(Error::UnknownCandidate {
            position,
            candidate_id,
        }) => {
            println!(
                "Verification failed: record {position} is for candidate {candidate_id}, \
                who is not standing in this election."
            );
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use chrono::{Duration, TimeZone, Utc};
    use ivoting_backend::model::{
        election::{Candidate, Election},
        ledger::{hash::voter_tag, VoteRecord, GENESIS},
        voter::Fingerprint,
    };

    /// An election with votes for candidates 1, 2, 1 and 1, in that order.
    fn example_dump() -> LedgerDump {
        let start = Utc.with_ymd_and_hms(2022, 4, 1, 0, 0, 0).unwrap();
        let election = Election {
            id: 1,
            description: "Example election".to_string(),
            start,
            end: Utc.with_ymd_and_hms(2022, 7, 1, 0, 0, 0).unwrap(),
            candidates: vec![
                Candidate {
                    id: 1,
                    election_id: 1,
                    name: "Piotr Nowak".to_string(),
                },
                Candidate {
                    id: 2,
                    election_id: 1,
                    name: "Anna Kowalska".to_string(),
                },
            ],
        };

        let mut records: Vec<VoteRecord> = Vec::new();
        for (n, candidate_id) in [1, 2, 1, 1].into_iter().enumerate() {
            let previous = records.last().map_or(GENESIS, |record| record.link_hash);
            let fingerprint = Fingerprint::from_bytes([n as u8; 32]);
            records.push(VoteRecord::new(
                election.id,
                n as Position + 1,
                candidate_id,
                voter_tag(&fingerprint, election.id),
                start + Duration::days(n as i64 + 1),
                &previous,
            ));
        }
        LedgerDump { election, records }
    }

    /// Write a dump where the test can read it back.
    fn write_dump(name: &str, dump: &LedgerDump) -> String {
        let path: PathBuf =
            std::env::temp_dir().join(format!("{name}-{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string(dump).unwrap()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn verification() {
        // This test actually enters backend code, so enable logging.
        log4rs_test_utils::test_logging::init_logging_once_for(
            ["ivoting_backend"],
            None,
            None,
        );

        let dump = example_dump();
        let expected_results = vec![
            FriendlyResults {
                candidate_name: "Piotr Nowak".to_string(),
                votes: 3,
            },
            FriendlyResults {
                candidate_name: "Anna Kowalska".to_string(),
                votes: 1,
            },
        ];
        assert_eq!(
            verify(&write_dump("election", &dump)),
            Ok(expected_results)
        );

        let empty = LedgerDump {
            records: Vec::new(),
            ..example_dump()
        };
        let expected_results = vec![
            FriendlyResults {
                candidate_name: "Anna Kowalska".to_string(),
                votes: 0,
            },
            FriendlyResults {
                candidate_name: "Piotr Nowak".to_string(),
                votes: 0,
            },
        ];
        assert_eq!(
            verify(&write_dump("election_empty", &empty)),
            Ok(expected_results)
        );

        let mut changed_vote = example_dump();
        changed_vote.records[2].candidate_id = 2;
        assert_eq!(
            verify(&write_dump("election_changed_vote", &changed_vote)),
            Err(Error::Chain { position: 3 })
        );

        let mut dropped_vote = example_dump();
        dropped_vote.records.remove(1);
        assert_eq!(
            verify(&write_dump("election_dropped_vote", &dropped_vote)),
            Err(Error::Chain { position: 2 })
        );

        let mut withdrawn = example_dump();
        withdrawn.election.candidates.truncate(1);
        assert_eq!(
            verify(&write_dump("election_withdrawn", &withdrawn)),
            Err(Error::UnknownCandidate {
                position: 2,
                candidate_id: 2,
            })
        );
    }

    #[test]
    fn correct_cli_usage() {
        let valid = write_dump("cli_valid", &example_dump());
        let command_line = [PROGRAM_NAME, valid.as_str()];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        let mut tampered = example_dump();
        tampered.records[0].timestamp = tampered.records[0].timestamp + Duration::seconds(1);
        let tampered = write_dump("cli_tampered", &tampered);
        let command_line = [PROGRAM_NAME, tampered.as_str()];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 255);

        let malformed =
            std::env::temp_dir().join(format!("cli_malformed-{}.json", std::process::id()));
        std::fs::write(&malformed, "{\"election\": ").unwrap();
        let malformed = malformed.to_string_lossy().into_owned();
        let command_line = [PROGRAM_NAME, malformed.as_str()];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);

        let command_line = [PROGRAM_NAME, "not a real file"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);
    }

    #[test]
    fn bad_cli_usage() {
        // Something very wrong.
        let command_line = [PROGRAM_NAME, "this", "invocation", "is", "incorrect"];
        cli().try_get_matches_from(command_line).unwrap_err();

        // No options at all.
        let command_line = [PROGRAM_NAME];
        cli().try_get_matches_from(command_line).unwrap_err();
    }
}
