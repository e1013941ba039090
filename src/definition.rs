//! Marshaling of PROJ4 definition strings into native buffers.

use libc::c_char;
use std::borrow::Cow;
use std::ffi::{CString, NulError};
use thiserror::Error;

/// A null-terminated copy of a projection definition, alive for one handle initialization.
///
/// PROJ4-style strings such as `+proj=longlat +datum=WGS84` describe an operation to current
/// PROJ releases unless they carry `+type=crs`, so it is appended when missing.
#[derive(Debug)]
pub(crate) struct ProjDefinition(CString);

impl ProjDefinition {
    pub fn new(definition: &str) -> Result<Self, DefinitionError> {
        let definition = as_crs_definition(definition);
        let c_definition = CString::new(definition.as_bytes())?;
        Ok(ProjDefinition(c_definition))
    }

    pub fn as_ptr(&self) -> *const c_char {
        self.0.as_ptr()
    }

    pub fn is_blank(&self) -> bool {
        self.0.as_bytes().iter().all(u8::is_ascii_whitespace)
    }
}

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("A nul byte was found in the PROJ string definition: {0}")]
    ArgumentNulError(#[from] NulError),
}

fn as_crs_definition(definition: &str) -> Cow<'_, str> {
    let mut params = definition
        .split_whitespace()
        .map(|token| token.trim_start_matches('+'));
    let is_proj4_string = params
        .clone()
        .any(|param| param.starts_with("proj=") || param.starts_with("init="));
    if is_proj4_string && !params.any(|param| param == "type=crs") {
        Cow::Owned(format!("{} +type=crs", definition.trim_end()))
    } else {
        Cow::Borrowed(definition)
    }
}
