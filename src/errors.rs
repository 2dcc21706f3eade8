#![allow(missing_docs)]
#![allow(deprecated)]

//! Error types for mandeltile, generated by `error_chain`.

use error_chain::error_chain;

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    foreign_links {
        Io(std::io::Error);
        Image(image::ImageError);
    }

    errors {
        InvalidParameters(reason: String) {
            description("invalid render parameters")
            display("invalid render parameters: {}", reason)
        }
        InvalidState(reason: String) {
            description("invalid session state")
            display("invalid session state: {}", reason)
        }
        WorkerPanicked(name: String) {
            description("a render thread panicked")
            display("render thread '{}' panicked", name)
        }
    }
}
