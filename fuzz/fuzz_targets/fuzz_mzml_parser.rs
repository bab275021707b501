#![no_main]

use libfuzzer_sys::fuzz_target;
use mzrange::mzml::MzMLSource;
use mzrange::source::{MsSource, Window};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Parsing either succeeds or fails gracefully, it never panics
    let Ok(mut source) = MzMLSource::from_reader(Cursor::new(data), "fuzz") else {
        return;
    };

    let window = Window::new(0.0, 2000.0, 0.0, 1000.0);
    let _ = source.trace(window);
    let _ = source.average_spectrum(window, false);
    let _ = source.area(window, false);
});
