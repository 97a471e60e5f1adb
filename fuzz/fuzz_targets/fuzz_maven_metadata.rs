#![no_main]

use jardoc_maven::{Coordinate, MavenMetadata};
use libfuzzer_sys::fuzz_target;

mod utils;

fuzz_target!(|data: &[u8]| {
    let Some(text) = utils::truncate_utf8(data) else {
        return;
    };
    if let Ok(metadata) = MavenMetadata::parse(text) {
        let coordinate = Coordinate::new("org.example", "api", "jar", "", "1.0-SNAPSHOT");
        let _ = coordinate.file_name(Some(&metadata));
    }
    let _ = text.parse::<Coordinate>();
});
