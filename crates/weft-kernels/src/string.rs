//! String assignment and string/number conversion kernels.

use std::fmt::Display;
use std::marker::PhantomData;

use weft_types::{StringData, StringEncoding, Type, TypeKind};

use crate::builder::KernelBuilder;
use crate::codec::Codec;
use crate::error::KernelError;
use crate::mode::AssignErrorMode;
use crate::numeric::{Element, Repr, ScalarKind, convert, with_element};
use crate::record::{Kernel, KernelRef};

/// Physical storage of a string element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringSlot {
    /// A [`StringData`] slot.
    Var,
    /// `bytes` inline bytes, NUL padded.
    Fixed { bytes: usize },
}

impl StringSlot {
    /// Slot and encoding of a string type.
    pub fn of(tp: &Type) -> Option<(StringSlot, StringEncoding)> {
        match tp.kind() {
            TypeKind::String { encoding } => Some((StringSlot::Var, *encoding)),
            TypeKind::FixedString { size, encoding } => Some((
                StringSlot::Fixed {
                    bytes: size * encoding.unit_size(),
                },
                *encoding,
            )),
            _ => None,
        }
    }

    /// Code units of the string at `ptr`, without fixed-width padding.
    ///
    /// # Safety
    ///
    /// `ptr` must address a valid element of this slot kind that outlives `'a`.
    pub unsafe fn read<'a>(self, ptr: *const u8, unit: usize) -> &'a [u8] {
        match self {
            StringSlot::Var => unsafe { (*ptr.cast::<StringData>()).bytes() },
            StringSlot::Fixed { bytes } => {
                let all = unsafe { std::slice::from_raw_parts(ptr, bytes) };
                let len = all
                    .chunks_exact(unit)
                    .position(|chunk| chunk.iter().all(|&b| b == 0))
                    .map_or(all.len(), |units| units * unit);
                &all[..len]
            }
        }
    }
}

/// Destination for encoded code units.
enum Sink<'a> {
    Fixed {
        out: &'a mut [u8],
        pos: usize,
        checked: bool,
    },
    Var(Vec<u8>),
}

impl<'a> Sink<'a> {
    /// # Safety
    ///
    /// For fixed slots `dst` must address `bytes` writable bytes.
    unsafe fn new(slot: StringSlot, dst: *mut u8, size_hint: usize, checked: bool) -> Self {
        match slot {
            StringSlot::Fixed { bytes } => Sink::Fixed {
                out: unsafe { std::slice::from_raw_parts_mut(dst, bytes) },
                pos: 0,
                checked,
            },
            StringSlot::Var => Sink::Var(Vec::with_capacity((size_hint + 16) * 1124 / 1024)),
        }
    }

    /// Appends `bytes`; returns false once a lossy fixed sink is full.
    fn push(&mut self, bytes: &[u8]) -> Result<bool, KernelError> {
        match self {
            Sink::Fixed { out, pos, checked } => {
                let end = *pos + bytes.len();
                if end > out.len() {
                    if *checked {
                        return Err(KernelError::StringTooLong {
                            needed: end,
                            capacity: out.len(),
                        });
                    }
                    return Ok(false);
                }
                out[*pos..end].copy_from_slice(bytes);
                *pos = end;
                Ok(true)
            }
            Sink::Var(buf) => {
                if buf.capacity() - buf.len() < 8 {
                    buf.reserve(buf.capacity().max(bytes.len()));
                }
                buf.extend_from_slice(bytes);
                Ok(true)
            }
        }
    }

    /// # Safety
    ///
    /// For var slots `dst` must address an initialized [`StringData`].
    unsafe fn finish(self, dst: *mut u8) {
        match self {
            Sink::Fixed { out, pos, .. } => out[pos..].fill(0),
            Sink::Var(buf) => unsafe { *dst.cast::<StringData>() = StringData::new(buf) },
        }
    }
}

fn transcode(
    src: &[u8],
    src_codec: &Codec,
    dst_codec: &Codec,
    sink: &mut Sink<'_>,
) -> Result<(), KernelError> {
    let mut pos = 0;
    let mut scratch = [0u8; 4];
    while pos < src.len() {
        let (c, used) = (src_codec.decode)(&src[pos..]).map_err(|e| match e {
            KernelError::Decode { encoding, offset } => KernelError::Decode {
                encoding,
                offset: pos + offset,
            },
            other => other,
        })?;
        let n = (dst_codec.encode)(c, &mut scratch)?;
        if !sink.push(&scratch[..n])? {
            break;
        }
        pos += used;
    }
    Ok(())
}

/// String to string assignment across slot kinds and encodings.
pub struct StringAssign {
    dst_slot: StringSlot,
    src_slot: StringSlot,
    dst_codec: Codec,
    src_codec: Codec,
    checked: bool,
}

impl StringAssign {
    pub fn new(
        dst: (StringSlot, StringEncoding),
        src: (StringSlot, StringEncoding),
        mode: AssignErrorMode,
    ) -> Self {
        let checked = mode.is_checked();
        Self {
            dst_slot: dst.0,
            src_slot: src.0,
            dst_codec: Codec::new(dst.1, checked),
            src_codec: Codec::new(src.1, checked),
            checked,
        }
    }
}

impl Kernel for StringAssign {
    unsafe fn single(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let bytes = unsafe { self.src_slot.read(src[0], self.src_codec.unit_size()) };
        let mut sink = unsafe { Sink::new(self.dst_slot, dst, bytes.len(), self.checked) };
        let fits = match self.dst_slot {
            StringSlot::Var => true,
            StringSlot::Fixed { bytes: capacity } => bytes.len() <= capacity,
        };
        if self.src_codec.encoding == self.dst_codec.encoding && fits {
            sink.push(bytes)?;
        } else {
            transcode(bytes, &self.src_codec, &self.dst_codec, &mut sink)?;
        }
        unsafe { sink.finish(dst) };
        Ok(())
    }
}

/// Formats a numeric element as text.
pub struct NumericToString<S> {
    dst_slot: StringSlot,
    dst_codec: Codec,
    checked: bool,
    _src: PhantomData<fn(S)>,
}

impl<S: Element + Display> NumericToString<S> {
    pub fn new(dst: (StringSlot, StringEncoding), mode: AssignErrorMode) -> Self {
        let checked = mode.is_checked();
        Self {
            dst_slot: dst.0,
            dst_codec: Codec::new(dst.1, checked),
            checked,
            _src: PhantomData,
        }
    }
}

impl<S: Element + Display> Kernel for NumericToString<S> {
    unsafe fn single(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let value = unsafe { src[0].cast::<S>().read_unaligned() };
        let text = value.to_string();
        let mut sink = unsafe { Sink::new(self.dst_slot, dst, text.len(), self.checked) };
        let utf8 = Codec::new(StringEncoding::Utf8, true);
        transcode(text.as_bytes(), &utf8, &self.dst_codec, &mut sink)?;
        unsafe { sink.finish(dst) };
        Ok(())
    }
}

/// Parses text into a numeric element.
pub struct StringToNumeric<D> {
    src_slot: StringSlot,
    src_codec: Codec,
    mode: AssignErrorMode,
    _dst: PhantomData<fn() -> D>,
}

impl<D: Element> StringToNumeric<D> {
    pub fn new(src: (StringSlot, StringEncoding), mode: AssignErrorMode) -> Self {
        Self {
            src_slot: src.0,
            src_codec: Codec::new(src.1, mode.is_checked()),
            mode,
            _dst: PhantomData,
        }
    }
}

impl<D: Element> Kernel for StringToNumeric<D> {
    unsafe fn single(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let bytes = unsafe { self.src_slot.read(src[0], self.src_codec.unit_size()) };
        let text = self.src_codec.decode_all(bytes)?;
        let repr = parse_number(&text, D::KIND)?;
        let out = convert::<D>(repr, self.mode)?;
        unsafe { dst.cast::<D>().write_unaligned(out) };
        Ok(())
    }
}

/// Parses trimmed text as a number destined for `dst`.
///
/// Integer literals stay exact; anything else goes through `f64`. Complex
/// destinations take the value as their real part.
pub fn parse_number(text: &str, dst: ScalarKind) -> Result<Repr, KernelError> {
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
    let parse_error = || KernelError::Parse {
        text: trimmed.to_string(),
        dst: dst.name(),
    };

    if dst == ScalarKind::Bool {
        match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "t" | "y" => return Ok(Repr::Int(1)),
            "false" | "no" | "off" | "f" | "n" => return Ok(Repr::Int(0)),
            _ => {}
        }
    }

    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && let Ok(magnitude) = digits.parse::<u128>()
        && magnitude <= i128::MAX as u128
    {
        let value = magnitude as i128;
        return Ok(Repr::Int(if negative { -value } else { value }));
    }

    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(parse_error());
    }
    trimmed
        .parse::<f64>()
        .map(Repr::Float)
        .map_err(|_| parse_error())
}

/// Emplaces the kernel formatting `src` elements into a string slot.
pub fn emplace_to_string(
    kb: &mut KernelBuilder,
    src: ScalarKind,
    dst: (StringSlot, StringEncoding),
    mode: AssignErrorMode,
) -> usize {
    with_element!(src, |S| kb.emplace(NumericToString::<S>::new(dst, mode)))
}

/// Emplaces the kernel parsing a string slot into `dst` elements.
pub fn emplace_from_string(
    kb: &mut KernelBuilder,
    dst: ScalarKind,
    src: (StringSlot, StringEncoding),
    mode: AssignErrorMode,
) -> usize {
    with_element!(dst, |D| kb.emplace(StringToNumeric::<D>::new(src, mode)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CallGraph, KernelBuilder, KernelRequest};
    use crate::chain::KernelChain;
    use weft_types::Arrmeta;

    fn chain_of<K: Kernel>(kernel: K) -> KernelChain {
        let mut graph = CallGraph::new();
        graph.push(move |kb, _, _, _| Ok(kb.emplace(kernel)));
        let mut kb = KernelBuilder::new(graph, 64);
        kb.instantiate_next(KernelRequest::Single, &Arrmeta::Empty, &[&Arrmeta::Empty])
            .unwrap();
        kb.finish(KernelRequest::Single).unwrap()
    }

    const VAR8: (StringSlot, StringEncoding) = (StringSlot::Var, StringEncoding::Utf8);

    #[test]
    fn parse_number_forms() {
        assert_eq!(parse_number(" 42 ", ScalarKind::Int32), Ok(Repr::Int(42)));
        assert_eq!(parse_number("-7", ScalarKind::Int8), Ok(Repr::Int(-7)));
        assert_eq!(parse_number("+7", ScalarKind::Int8), Ok(Repr::Int(7)));
        assert_eq!(parse_number("3.25", ScalarKind::Float64), Ok(Repr::Float(3.25)));
        assert_eq!(parse_number("1e3", ScalarKind::Int32), Ok(Repr::Float(1000.0)));
        assert_eq!(parse_number("Yes", ScalarKind::Bool), Ok(Repr::Int(1)));
        assert!(matches!(
            parse_number("inf", ScalarKind::Float32),
            Ok(Repr::Float(f)) if f.is_infinite()
        ));
        assert!(parse_number("--1", ScalarKind::Int32).is_err());
        assert!(parse_number("", ScalarKind::Int32).is_err());
        assert!(parse_number("12abc", ScalarKind::Int32).is_err());
    }

    #[test]
    fn string_to_int_by_mode() {
        let run = |text: &str, mode| {
            let chain = chain_of(StringToNumeric::<i8>::new(VAR8, mode));
            let src = StringData::from_text(text);
            let mut out = 0i8;
            unsafe { chain.single((&raw mut out).cast(), &[(&raw const src).cast()]) }.map(|_| out)
        };
        assert_eq!(run("  -12\t", AssignErrorMode::Overflow), Ok(-12));
        assert!(matches!(run("300", AssignErrorMode::Overflow), Err(KernelError::Overflow { .. })));
        assert_eq!(run("300", AssignErrorMode::NoCheck), Ok(44));
        assert!(matches!(run("2.5", AssignErrorMode::Fractional), Err(KernelError::Fractional { .. })));
        assert!(matches!(run("x", AssignErrorMode::NoCheck), Err(KernelError::Parse { .. })));
    }

    #[test]
    fn number_to_fixed_string_pads_and_truncates() {
        let fixed = (StringSlot::Fixed { bytes: 4 }, StringEncoding::Ascii);
        let chain = chain_of(NumericToString::<i32>::new(fixed, AssignErrorMode::Overflow));
        let mut out = [0xffu8; 4];
        let src = 42i32;
        unsafe { chain.single(out.as_mut_ptr(), &[(&raw const src).cast()]) }.unwrap();
        assert_eq!(&out, b"42\0\0");

        let src = 123_456i32;
        let err = unsafe { chain.single(out.as_mut_ptr(), &[(&raw const src).cast()]) };
        assert!(matches!(err, Err(KernelError::StringTooLong { .. })));

        let lossy = chain_of(NumericToString::<i32>::new(fixed, AssignErrorMode::NoCheck));
        unsafe { lossy.single(out.as_mut_ptr(), &[(&raw const src).cast()]) }.unwrap();
        assert_eq!(&out, b"1234");
    }

    #[test]
    fn var_utf8_to_fixed_utf16_and_back() {
        let fixed16 = (StringSlot::Fixed { bytes: 8 }, StringEncoding::Utf16);
        let to_fixed = chain_of(StringAssign::new(fixed16, VAR8, AssignErrorMode::Inexact));
        let src = StringData::from_text("hé");
        let mut fixed = [0u8; 8];
        unsafe { to_fixed.single(fixed.as_mut_ptr(), &[(&raw const src).cast()]) }.unwrap();
        let expected: Vec<u8> = "hé"
            .encode_utf16()
            .chain([0, 0])
            .flat_map(u16::to_ne_bytes)
            .collect();
        assert_eq!(fixed.as_slice(), expected.as_slice());

        let to_var = chain_of(StringAssign::new(VAR8, fixed16, AssignErrorMode::Inexact));
        let mut back = StringData::default();
        unsafe { to_var.single((&raw mut back).cast(), &[fixed.as_ptr()]) }.unwrap();
        assert_eq!(back.as_str(), Some("hé"));
    }

    #[test]
    fn long_var_string_grows() {
        let chain = chain_of(StringAssign::new(
            VAR8,
            (StringSlot::Var, StringEncoding::Utf32),
            AssignErrorMode::Inexact,
        ));
        let text: String = std::iter::repeat_n("ab€", 200).collect();
        let utf32: Vec<u8> = text.chars().flat_map(|c| (c as u32).to_ne_bytes()).collect();
        let src = StringData::new(utf32);
        let mut out = StringData::default();
        unsafe { chain.single((&raw mut out).cast(), &[(&raw const src).cast()]) }.unwrap();
        assert_eq!(out.as_str(), Some(text.as_str()));
    }

    #[test]
    fn emplace_helpers_pick_element_type() {
        let chain_with = |emplace: fn(&mut KernelBuilder) -> usize| {
            let mut graph = CallGraph::new();
            graph.push(move |kb, _, _, _| Ok(emplace(kb)));
            let mut kb = KernelBuilder::new(graph, 64);
            kb.instantiate_next(KernelRequest::Single, &Arrmeta::Empty, &[&Arrmeta::Empty])
                .unwrap();
            kb.finish(KernelRequest::Single).unwrap()
        };

        let format = chain_with(|kb| {
            emplace_to_string(kb, ScalarKind::Float64, VAR8, AssignErrorMode::Inexact)
        });
        let src = 2.5f64;
        let mut text = StringData::default();
        unsafe { format.single((&raw mut text).cast(), &[(&raw const src).cast()]) }.unwrap();
        assert_eq!(text.as_str(), Some("2.5"));

        let parse = chain_with(|kb| {
            emplace_from_string(kb, ScalarKind::Int16, VAR8, AssignErrorMode::Overflow)
        });
        let src = StringData::from_text("-300");
        let mut out = 0i16;
        unsafe { parse.single((&raw mut out).cast(), &[(&raw const src).cast()]) }.unwrap();
        assert_eq!(out, -300);
    }

    #[test]
    fn fixed_source_stops_at_nul() {
        let chain = chain_of(StringAssign::new(
            VAR8,
            (StringSlot::Fixed { bytes: 6 }, StringEncoding::Ascii),
            AssignErrorMode::Inexact,
        ));
        let src = *b"abc\0zz";
        let mut out = StringData::default();
        unsafe { chain.single((&raw mut out).cast(), &[src.as_ptr()]) }.unwrap();
        assert_eq!(out.as_str(), Some("abc"));
    }
}
