// Copyright (c) 2021 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

pub(crate) mod read;
pub(crate) mod write;

/// Routes tracing output through the test harness.
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).parse_filters("trace").try_init();
}
