use std::io;
use std::path::Path;

use downgrader_core::integrity::IntegrityChecker;

pub fn run(file: &Path) -> io::Result<String> {
    IntegrityChecker::new().digest(file)
}
