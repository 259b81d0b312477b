//! Case I/O: token input and framed per-case output

mod input;
mod output;

pub use input::Input;
pub use output::{Output, PeriodicGate};

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::common::{Error, Result};

/// Input reader and output sink of a session
///
/// Moved into the worker for the duration of a case and handed back with
/// the completion signal, so exactly one thread owns them at a time.
pub struct CaseIo {
    pub input: Input,
    pub sink: Box<dyn Write + Send>,
}

impl CaseIo {
    /// Open the input file and create (truncate) the output file
    pub fn open(input: &Path, output: &Path) -> Result<Self> {
        let input_file = File::open(input).map_err(|e| Error::input_open(input, e))?;
        let output_file = File::create(output).map_err(|e| Error::output_create(output, e))?;
        Ok(Self {
            input: Input::new(BufReader::new(input_file)),
            sink: Box::new(BufWriter::new(output_file)),
        })
    }
}
