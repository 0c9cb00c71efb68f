//! Byte layouts shared with ILE

use ccsid_bridge::ffi::{ArglistBase, MemPointer, Signature, TaggedPointer};
use ccsid_bridge::ffi::ArgType;
use ccsid_bridge::iconv::{IconvArglist, IconvCloseArglist, IconvOpenArglist, IconvT, QtqCode};
use proptest::prelude::*;
use std::mem::{align_of, offset_of, size_of};

#[test]
fn test_tagged_pointer_layout() {
    assert_eq!(size_of::<TaggedPointer>(), 16);
    assert_eq!(align_of::<TaggedPointer>(), 16);
    assert_eq!(size_of::<MemPointer>(), 16);
}

#[test]
fn test_iconv_arglist_offsets() {
    assert_eq!(size_of::<ArglistBase>(), 32);
    assert_eq!(size_of::<IconvOpenArglist>(), 64);
    assert_eq!(size_of::<IconvArglist>(), 160);
    assert_eq!(offset_of!(IconvArglist, cd), 32);
    assert_eq!(offset_of!(IconvArglist, in_buf), 96);
    assert_eq!(offset_of!(IconvArglist, out_len), 144);
    assert_eq!(offset_of!(IconvCloseArglist, cd), 32);
}

#[test]
fn test_descriptor_and_code_sizes() {
    assert_eq!(size_of::<IconvT>(), 52);
    assert_eq!(size_of::<QtqCode>(), 32);
}

#[test]
fn test_iconv_signature_codes() {
    let sig = Signature::new(&[
        ArgType::by_value::<IconvT>(),
        ArgType::MemPtr,
        ArgType::MemPtr,
        ArgType::MemPtr,
        ArgType::MemPtr,
    ])
    .unwrap();
    assert_eq!(sig.codes(), &[52, -11, -11, -11, -11, 0]);
}

proptest! {
    #[test]
    fn prop_mem_pointer_keeps_address(addr in any::<usize>()) {
        let pointer = MemPointer::from_addr(addr);
        prop_assert_eq!(pointer.addr(), addr);
        prop_assert_eq!(pointer.raw().hi, 0);
    }

    #[test]
    fn prop_tagged_pointer_display_is_fixed_width(hi in any::<u64>(), lo in any::<u64>()) {
        let text = TaggedPointer::new(hi, lo).to_string();
        prop_assert_eq!(text.len(), 32);
        prop_assert_eq!(u64::from_str_radix(&text[..16], 16).unwrap(), hi);
        prop_assert_eq!(u64::from_str_radix(&text[16..], 16).unwrap(), lo);
    }

    #[test]
    fn prop_aggregate_codes_are_sizes(size in 1usize..=i16::MAX as usize) {
        prop_assert_eq!(ArgType::Aggregate(size).code().unwrap() as usize, size);
    }
}
