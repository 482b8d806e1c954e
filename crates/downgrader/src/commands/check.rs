use std::io;
use std::path::Path;

use downgrader_core::integrity::{IntegrityChecker, Verification};

pub enum CheckResult {
    Match,
    NoMatch { actual: String },
}

pub fn run(expected: &str, file: &Path) -> io::Result<CheckResult> {
    match IntegrityChecker::new().verify(file, expected)? {
        Verification::Ok => Ok(CheckResult::Match),
        Verification::Mismatch { actual } => Ok(CheckResult::NoMatch { actual }),
        Verification::Missing => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found", file.display()),
        )),
    }
}
