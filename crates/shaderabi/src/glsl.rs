//! Textual scan of GLSL `layout(...)` declarations.
//!
//! This is not a parser. It understands enough of the declaration grammar to
//! recover set, binding and location assignments from sources that compile,
//! which lets bindings be checked before (or without) running a compiler.

use serde::Serialize;
use spvreflect::DescriptorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    Uniform,
    Buffer,
    In,
    Out,
    /// A qualifier-only statement such as `layout(local_size_x = 8) in;`
    /// or a declaration without a recognised storage qualifier.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutDecl {
    /// 1-based line of the `layout` keyword.
    pub line: usize,
    pub set: Option<u32>,
    pub binding: Option<u32>,
    pub location: Option<u32>,
    pub push_constant: bool,
    pub storage: Storage,
    /// GLSL type, or the block name for interface blocks.
    pub type_name: String,
    /// Instance name; empty for anonymous blocks.
    pub name: String,
    /// Array length from `name[N]`.
    pub array_len: Option<u32>,
    pub is_block: bool,
}

impl LayoutDecl {
    pub fn descriptor_kind(&self) -> Option<DescriptorKind> {
        if self.push_constant {
            return None;
        }
        match self.storage {
            Storage::Uniform if self.is_block => Some(DescriptorKind::UniformBuffer),
            Storage::Buffer if self.is_block => Some(DescriptorKind::StorageBuffer),
            Storage::Uniform => opaque_kind(&self.type_name),
            _ => None,
        }
    }

    /// Number of components for scalar and vector `in`/`out` types.
    pub fn component_count(&self) -> Option<u32> {
        let ty = self.type_name.as_str();
        match ty {
            "float" | "int" | "uint" | "bool" | "double" => Some(1),
            _ => {
                let digit = ty
                    .strip_prefix("vec")
                    .or_else(|| ty.strip_prefix("ivec"))
                    .or_else(|| ty.strip_prefix("uvec"))
                    .or_else(|| ty.strip_prefix("dvec"))
                    .or_else(|| ty.strip_prefix("bvec"))?;
                digit.parse().ok().filter(|n| (2..=4).contains(n))
            }
        }
    }
}

fn opaque_kind(type_name: &str) -> Option<DescriptorKind> {
    let base = type_name
        .strip_prefix(['i', 'u'])
        .filter(|rest| ["sampler", "texture", "image", "subpassInput"].iter().any(|p| rest.starts_with(p)))
        .unwrap_or(type_name);
    let kind = if base == "sampler" || base == "samplerShadow" {
        DescriptorKind::Sampler
    } else if base == "samplerBuffer" {
        DescriptorKind::UniformTexelBuffer
    } else if base == "imageBuffer" {
        DescriptorKind::StorageTexelBuffer
    } else if base.starts_with("subpassInput") {
        DescriptorKind::InputAttachment
    } else if base.starts_with("sampler") {
        DescriptorKind::CombinedImageSampler
    } else if base.starts_with("texture") {
        DescriptorKind::SampledImage
    } else if base.starts_with("image") {
        DescriptorKind::StorageImage
    } else {
        return None;
    };
    Some(kind)
}

const SKIPPED_QUALIFIERS: &[&str] = &[
    "flat", "smooth", "noperspective", "centroid", "sample", "patch", "invariant", "precise",
    "highp", "mediump", "lowp", "readonly", "writeonly", "coherent", "volatile", "restrict",
    "const",
];

/// Returns every `layout(...)`-qualified declaration in `source`, in order.
pub fn scan_layouts(source: &str) -> Vec<LayoutDecl> {
    let text = strip_comments_and_directives(source);
    let bytes = text.as_bytes();
    let mut decls = Vec::new();
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find("layout") {
        let start = cursor + found;
        let end = start + "layout".len();
        cursor = end;
        let boundary_before = start == 0 || !is_ident_byte(bytes[start - 1]);
        let boundary_after = end >= bytes.len() || !is_ident_byte(bytes[end]);
        if !boundary_before || !boundary_after {
            continue;
        }

        let rest = &text[end..];
        let open = rest.len() - rest.trim_start().len();
        if !rest[open..].starts_with('(') {
            continue;
        }
        let Some(close) = rest[open..].find(')') else {
            break;
        };
        let qualifiers = &rest[open + 1..open + close];
        let after = end + open + close + 1;
        cursor = after;

        let mut decl = LayoutDecl {
            line: text[..start].matches('\n').count() + 1,
            set: None,
            binding: None,
            location: None,
            push_constant: false,
            storage: Storage::Other,
            type_name: String::new(),
            name: String::new(),
            array_len: None,
            is_block: false,
        };
        apply_qualifiers(&mut decl, qualifiers);

        let tail = &text[after..];
        let Some(stop) = tail.find([';', '{']) else {
            decls.push(decl);
            break;
        };
        let head: Vec<&str> = tail[..stop].split_whitespace().collect();
        let mut remaining = Vec::new();
        for word in head.iter().copied().filter(|w| !SKIPPED_QUALIFIERS.contains(w)) {
            match word {
                "uniform" => decl.storage = Storage::Uniform,
                "buffer" => decl.storage = Storage::Buffer,
                "in" => decl.storage = Storage::In,
                "out" => decl.storage = Storage::Out,
                other => remaining.push(other),
            }
        }

        if tail.as_bytes()[stop] == b'{' {
            decl.is_block = true;
            decl.type_name = remaining.last().map(|w| w.to_string()).unwrap_or_default();
            let body = &tail[stop..];
            if let Some(close) = body.find('}') {
                let instance = &body[close + 1..];
                let instance = instance.split(';').next().unwrap_or_default().trim();
                let (name, len) = split_array(instance);
                decl.name = name;
                decl.array_len = len;
                cursor = after + stop + close + 1;
            }
        } else {
            let joined = remaining.join(" ");
            let mut parts = joined.splitn(2, ' ');
            decl.type_name = parts.next().unwrap_or_default().to_string();
            let (name, len) = split_array(parts.next().unwrap_or_default().trim());
            decl.name = name;
            decl.array_len = len;
            cursor = after + stop + 1;
        }
        decls.push(decl);
    }
    decls
}

fn apply_qualifiers(decl: &mut LayoutDecl, qualifiers: &str) {
    for item in qualifiers.split(',') {
        let mut kv = item.splitn(2, '=');
        let key = kv.next().unwrap_or_default().trim();
        let value = kv.next().and_then(|v| parse_int(v.trim()));
        match key {
            "set" => decl.set = value,
            "binding" => decl.binding = value,
            "location" => decl.location = value,
            "push_constant" => decl.push_constant = true,
            _ => {}
        }
    }
}

fn parse_int(value: &str) -> Option<u32> {
    let value = value.trim_end_matches(['u', 'U']);
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn split_array(text: &str) -> (String, Option<u32>) {
    match text.split_once('[') {
        Some((name, rest)) => {
            let len = rest.split(']').next().and_then(|n| parse_int(n.trim()));
            (name.trim().to_string(), len)
        }
        None => (text.to_string(), None),
    }
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Blanks comments and preprocessor lines while keeping line breaks, so byte
/// offsets still map to the original line numbers.
fn strip_comments_and_directives(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut line_start = true;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
                line_start = true;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            '#' if line_start => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '\n' => {
                out.push('\n');
                line_start = true;
            }
            c => {
                if !c.is_whitespace() {
                    line_start = false;
                }
                out.push(c);
            }
        }
    }
    out
}
