//! Method component (tag 7)
//!
//! An exception handler table followed by method bodies packed back to back.
//! The component itself does not delimit its bodies; boundaries come from
//! Descriptor's `method_offset`/`bytecode_count` entries when a Descriptor
//! is present. Without one, the bodies are kept as a single opaque blob.
//! Bytecodes are recorded opaquely, never disassembled.

use serde_json::Value;

use crate::context::Context;
use crate::error::{Result, Warning};
use crate::reader::Reader;
use crate::record::{Fields, Record, hex_value};

use super::flag_names;

const METHOD_FLAGS: [(u8, &str); 2] = [(0x8, "ACC_EXTENDED"), (0x4, "ACC_ABSTRACT")];

/// Header flag marking the 4-byte extended method header form
const ACC_EXTENDED_HEADER: u8 = 0x8;

/// `impdep1` / `impdep2` must not appear in card-resident bytecode
const IMPDEP1: u8 = 0xfe;
const IMPDEP2: u8 = 0xff;

pub(crate) fn decode(
    reader: &mut Reader<'_>,
    ctx: &Context,
    record: &mut Record,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let handler_count = reader.u1()?;
    record.put("handler_count-u1", handler_count);

    let mut handlers = Vec::with_capacity(handler_count as usize);
    let mut previous_handler_offset = 0u16;
    for i in 0..handler_count {
        let start_offset = reader.u2()?;
        let (stop_bit, active_length) = reader.stop_bit_length()?;
        let handler_offset = reader.u2()?;
        let catch_type_index = reader.u2()?;

        if handler_offset < previous_handler_offset {
            warnings.push(Warning::InvariantViolation {
                component: "Method".to_owned(),
                detail: format!("handler {i} breaks handler_offset ordering"),
            });
        }
        previous_handler_offset = handler_offset;

        let mut h = Fields::new();
        h.insert("start_offset-u2".to_owned(), start_offset.into());
        h.insert("stop_bit".to_owned(), stop_bit.into());
        h.insert("active_length".to_owned(), active_length.into());
        h.insert("handler_offset-u2".to_owned(), handler_offset.into());
        h.insert("catch_type_index-u2".to_owned(), catch_type_index.into());
        handlers.push(Value::Object(h.into_iter().collect()));
    }
    record.put("exception_handlers", Value::Array(handlers));

    if ctx.method_bounds.is_empty() {
        // No Descriptor to consult; keep the bodies opaque.
        let rest = reader.take(reader.remaining())?;
        if !rest.is_empty() {
            scan_forbidden(rest, reader.pos() - rest.len(), warnings);
            record.put("methods", hex_value(rest));
        }
        return Ok(());
    }

    let mut methods = Vec::new();
    for bounds in &ctx.method_bounds {
        let offset = bounds.offset as usize;
        if offset < reader.pos() || offset > reader.pos() + reader.remaining() {
            warnings.push(Warning::InvariantViolation {
                component: "Method".to_owned(),
                detail: format!("descriptor method_offset {offset} out of sequence"),
            });
            continue;
        }
        if offset > reader.pos() {
            let gap = reader.take(offset - reader.pos())?;
            let mut g = Fields::new();
            g.insert("offset".to_owned(), (offset - gap.len()).into());
            g.insert("gap".to_owned(), hex_value(gap));
            methods.push(Value::Object(g.into_iter().collect()));
        }

        let mut m = Fields::new();
        m.insert("offset".to_owned(), offset.into());
        let bitfield = reader.u1()?;
        let flags = bitfield >> 4;
        m.insert("bitfield-u1".to_owned(), bitfield.into());
        m.insert("flags".to_owned(), flag_names(flags, &METHOD_FLAGS));
        if flags & ACC_EXTENDED_HEADER != 0 {
            m.insert("max_stack-u1".to_owned(), reader.u1()?.into());
            m.insert("nargs-u1".to_owned(), reader.u1()?.into());
            m.insert("max_locals-u1".to_owned(), reader.u1()?.into());
        } else {
            m.insert("max_stack".to_owned(), (bitfield & 0x0f).into());
            let args = reader.u1()?;
            m.insert("nargs".to_owned(), (args >> 4).into());
            m.insert("max_locals".to_owned(), (args & 0x0f).into());
        }

        let bytecode_offset = reader.pos();
        let bytecodes = reader.take(bounds.bytecode_count as usize)?;
        scan_forbidden(bytecodes, bytecode_offset, warnings);
        m.insert("bytecode_count".to_owned(), bounds.bytecode_count.into());
        m.insert("bytecodes".to_owned(), hex_value(bytecodes));
        methods.push(Value::Object(m.into_iter().collect()));
    }
    record.put("methods", Value::Array(methods));
    Ok(())
}

fn scan_forbidden(bytecodes: &[u8], base: usize, warnings: &mut Vec<Warning>) {
    for (i, &b) in bytecodes.iter().enumerate() {
        if b == IMPDEP1 || b == IMPDEP2 {
            warnings.push(Warning::ForbiddenInstruction {
                opcode: b,
                offset: base + i,
            });
        }
    }
}
