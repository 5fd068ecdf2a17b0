use std::fs;
use std::path::Path;

use crate::error::{ErrorDetail, Result, Chainable, Error};

pub trait Format: Sized {
    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    /// Parses `string` as the data format `Self` as a `T` or returns an error
    /// if the `string` is an invalid `T`. **_Note:_** This method is _not_
    /// intended to be called directly. Instead, it is intended to be
    /// _implemented_ and then used indirectly via [`Format::read()`] or
    /// [`Format::parse()`].
    fn from_str<T: serde::de::DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    /// Parses `string`, attributing failures to `path`.
    fn parse<T, P>(string: &str, path: P) -> Result<T>
        where T: serde::de::DeserializeOwned, P: AsRef<Path>
    {
        Self::from_str(string).chain_with(|| error! {
            "failed to deserialize data",
            "path" => path.as_ref().display(),
        })
    }

    /// Reads and parses the file at `path`.
    fn read<T, P>(path: P) -> Result<T>
        where T: serde::de::DeserializeOwned, P: AsRef<Path>
    {
        let path = path.as_ref();
        let string = fs::read_to_string(path).map_err(|e| Error::file(e, path))?;
        Self::parse(&string, path)
    }
}

#[allow(unused_macros)]
macro_rules! impl_format {
    ($name:ident : $func:expr, $E:ty) => (
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            fn from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Toml: toml::from_str, toml::de::Error);
