//! Pure, stateless debugger-text → structure parsing (spec §4.4). Every
//! extractor locates a labelled region and fails gracefully (returns
//! empty/zero) when absent — there is no notion of a malformed report,
//! only an incomplete one.

use std::collections::HashMap;

use regex::Regex;

use fathom_core::{LoadedModule, StackFrame};

fn single_label(text: &str, label: &str) -> String {
    let pattern = format!(r"(?m)^{}:(.*)$", regex::escape(label));
    Regex::new(&pattern)
        .expect("static pattern")
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default()
}

/// `STACK_FRAME:<text>` lines, in file order (spec §4.4).
pub fn stack_trace(text: &str) -> Vec<(usize, String)> {
    let re = Regex::new(r"(?m)^STACK_FRAME:(.*)$").expect("static pattern");
    re.captures_iter(text)
        .enumerate()
        .map(|(i, c)| (i, c[1].trim().to_string()))
        .collect()
}

/// Split a `module!function+offset` stack-frame line into a [`StackFrame`].
/// Uses `func_name` throughout (spec §9: the source reads from an
/// undefined `function` symbol; the intended lookup is `func_name`).
pub fn parse_stack_frame(index: usize, raw: &str) -> StackFrame {
    let re = Regex::new(r"^(?P<module>[^!]*)!(?P<func_name>[^+]*)\+(?P<offset>.*)$")
        .expect("static pattern");
    if let Some(caps) = re.captures(raw) {
        StackFrame {
            index,
            module: Some(caps["module"].to_string()),
            func_name: Some(caps["func_name"].to_string()),
            offset: Some(caps["offset"].trim().to_string()),
            raw: raw.to_string(),
        }
    } else {
        StackFrame {
            index,
            module: None,
            func_name: None,
            offset: None,
            raw: raw.to_string(),
        }
    }
}

/// `BASIC_BLOCK_INSTRUCTION:<text>` lines, in file order (spec §4.4).
pub fn disassembly(text: &str) -> Vec<(usize, String)> {
    let re = Regex::new(r"(?m)^BASIC_BLOCK_INSTRUCTION:(.*)$").expect("static pattern");
    re.captures_iter(text)
        .enumerate()
        .map(|(i, c)| (i, c[1].trim().to_string()))
        .collect()
}

/// Parse every `^[0-9a-f]{8} [0-9a-f]{8} … (symbol-status) … (key: value)+`
/// block until the next such header (spec §4.4). Entries without an
/// `Image name` key are dropped.
pub fn loaded_modules(text: &str) -> HashMap<String, LoadedModule> {
    let header_re =
        Regex::new(r"(?m)^(?P<base>[0-9a-f]{8}) (?P<end>[0-9a-f]{8}) +(?P<status>.*)$")
            .expect("static pattern");
    let kv_re = Regex::new(r"^\s*([A-Za-z ]+?):\s*(.*)$").expect("static pattern");

    let headers: Vec<_> = header_re.captures_iter(text).collect();
    let mut out = HashMap::new();

    for (i, caps) in headers.iter().enumerate() {
        let whole = caps.get(0).unwrap();
        let block_start = whole.end();
        let block_end = headers
            .get(i + 1)
            .map(|next| next.get(0).unwrap().start())
            .unwrap_or(text.len());
        let block = &text[block_start..block_end];

        let mut kv: HashMap<String, String> = HashMap::new();
        for line in block.lines() {
            if let Some(c) = kv_re.captures(line) {
                kv.insert(c[1].trim().to_string(), c[2].trim().to_string());
            }
        }

        let Some(name) = kv.get("Image name").cloned() else {
            continue;
        };
        let base_address = caps["base"].to_string();
        let status = caps["status"].to_string();
        let syms_loaded = status.to_lowercase().contains("pdb");
        out.insert(
            base_address.clone(),
            LoadedModule {
                base_address,
                syms_loaded,
                name: Some(name),
                size: kv.get("size").cloned(),
                timestamp: kv.get("timestamp").cloned(),
                version: kv.get("version").cloned(),
                checksum: kv.get("checksum").cloned(),
            },
        );
    }
    out
}

/// Registers from the last block spanning `eax` through `iopl` (spec
/// §4.4): `e??=hexvalue` pairs.
pub fn registers(text: &str) -> HashMap<String, u64> {
    let block_re = Regex::new(r"(?s)eax=.*?iopl=\S*").expect("static pattern");
    let reg_re = Regex::new(r"(e[a-z]{2})=([0-9a-fA-F]+)").expect("static pattern");

    let Some(last_block) = block_re.find_iter(text).last() else {
        return HashMap::new();
    };
    reg_re
        .captures_iter(last_block.as_str())
        .map(|c| {
            let value = u64::from_str_radix(&c[2], 16).unwrap_or(0);
            (c[1].to_string(), value)
        })
        .collect()
}

pub fn classification(text: &str) -> String {
    single_label(text, "CLASSIFICATION")
}

pub fn exception_type(text: &str) -> String {
    single_label(text, "EXCEPTION_TYPE")
}

pub fn exception_subtype(text: &str) -> String {
    single_label(text, "EXCEPTION_SUBTYPE")
}

pub fn long_desc(text: &str) -> String {
    single_label(text, "LONG_DESC")
}

/// `major.minor` from `MAJOR_HASH:`/`MINOR_HASH:`; falls back to a
/// `Hash=<value>` pattern; empty if neither is present (spec §4.4).
pub fn hash(text: &str) -> String {
    let major = single_label(text, "MAJOR_HASH");
    let minor = single_label(text, "MINOR_HASH");
    if !major.is_empty() || !minor.is_empty() {
        return format!("{major}.{minor}");
    }
    let fallback = Regex::new(r"Hash=(\S+)").expect("static pattern");
    fallback
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}
