#![forbid(unsafe_code)]

//! Canonicalization algorithm URI constants.
//!
//! Each constant is the canonical URI string that identifies the
//! algorithm in `CanonicalizationMethod` / `Transform` elements.

pub const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const C14N_WITH_COMMENTS: &str =
    "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const EXC_C14N_WITH_COMMENTS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";
