#![no_main]

use ismrmrd_dataset::prelude::*;
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic the record decoders
    let _ = Acquisition::decode(data);
    let _ = Image::<u16>::decode(data);
    let _ = NdArray::<f64>::decode(data);

    // Nor the container loader, whether or not they form a valid archive
    let Ok(mut file) = tempfile::NamedTempFile::new() else {
        return;
    };
    if file.write_all(data).is_err() {
        return;
    }

    let mut dataset = match Dataset::init(file.path(), "/dataset") {
        Ok(dataset) => dataset,
        Err(_) => return,
    };
    if dataset.open(false).is_ok() {
        let _ = dataset.read_header();
        if let Ok(names) = dataset.series_names() {
            for name in names {
                if let Ok(count) = dataset.count(&name) {
                    for index in 0..count.min(16) {
                        let _ = dataset.read_acquisition(index);
                    }
                }
            }
        }
        let _ = dataset.close();
    }
});
