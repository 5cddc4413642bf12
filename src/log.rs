#[cfg(feature = "log")]
pub(crate) use ::log::{debug, trace, warn};

#[cfg(not(feature = "log"))]
mod noop {
    macro_rules! trace {
        ($($tt:tt)*) => {};
    }
    macro_rules! debug {
        ($($tt:tt)*) => {};
    }
    macro_rules! warn_ {
        ($($tt:tt)*) => {};
    }

    pub(crate) use {debug, trace, warn_ as warn};
}

#[cfg(not(feature = "log"))]
pub(crate) use noop::{debug, trace, warn};
