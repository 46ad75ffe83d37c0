use swc_core::common::{sync::Lrc, BytePos, SourceMap};
use swc_core::ecma::ast::Program;
use swc_core::ecma::codegen::{text_writer::JsWriter, Config, Emitter};

use crate::error::{InstrumentError, Result};

/// Where the printer was in the generated text when it wrote a node that
/// came from `source_pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedPosition {
    pub source_pos: BytePos,
    pub generated_line: u32,
    pub generated_column: u32,
}

pub(crate) struct Printed {
    pub text: String,
    pub positions: Vec<RecordedPosition>,
}

/// Prints `program` with the swc code generator, collecting the positions it
/// records for the source map in emission order.
pub(crate) fn print_program(cm: &Lrc<SourceMap>, new_line: &str, program: &Program) -> Result<Printed> {
    let mut buf = Vec::new();
    let mut srcmap = Vec::new();
    {
        let wr = JsWriter::new(cm.clone(), new_line, &mut buf, Some(&mut srcmap));
        let mut emitter = Emitter {
            cfg: Config::default(),
            cm: cm.clone(),
            comments: None,
            wr,
        };
        match program {
            Program::Module(module) => emitter.emit_module(module)?,
            Program::Script(script) => emitter.emit_script(script)?,
        }
    }

    let text = String::from_utf8(buf).map_err(|err| {
        InstrumentError::Emit(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })?;
    let positions = srcmap
        .into_iter()
        .map(|(source_pos, lc)| RecordedPosition {
            source_pos,
            generated_line: lc.line,
            generated_column: lc.col,
        })
        .collect();

    Ok(Printed { text, positions })
}
