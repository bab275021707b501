#![no_main]

use libfuzzer_sys::fuzz_target;
use mzrange::cache::BinaryIndexedStore;
use mzrange::source::{MsSource, Window};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Header parsing must reject malformed input without panicking
    let Ok(mut store) = BinaryIndexedStore::from_reader(Cursor::new(data)) else {
        return;
    };

    // A header that parsed must also survive queries over its pages
    let _ = store.points(Window::new(0.0, f64::MAX, f64::MIN, f64::MAX));
    let _ = store.trace(Window::new(100.0, 1000.0, 0.0, 1000.0));
    let _ = store.scan_from_rt(1.0);
});
