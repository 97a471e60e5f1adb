#![no_main]

use std::io::{Read, Seek, SeekFrom};

use jardoc_archive::{Handle, VirtualFileSystem};
use libfuzzer_sys::fuzz_target;

mod utils;

/// Decompress at most this much per entry.
const READ_LIMIT: u64 = 64 * 1024;

fn walk(fs: &VirtualFileSystem, path: &str, depth: usize) {
    if depth > 16 {
        return;
    }
    let Ok(handle) = fs.open(path) else {
        return;
    };
    match handle {
        Handle::Directory(mut dir) => {
            loop {
                let page = dir.read_dir(8);
                if page.is_empty() {
                    break;
                }
                for entry in &page {
                    let child = if path.is_empty() {
                        entry.name().to_string()
                    } else {
                        format!("{path}/{}", entry.name())
                    };
                    walk(fs, &child, depth + 1);
                }
            }
        }
        Handle::File(mut file) => {
            let mut head = Vec::new();
            if file.by_ref().take(READ_LIMIT).read_to_end(&mut head).is_err() {
                return;
            }
            // Re-reading the second half after a backward seek must agree.
            let half = head.len() / 2;
            if file.seek(SeekFrom::Start(half as u64)).is_err() {
                return;
            }
            let mut tail = Vec::new();
            let want = (head.len() - half) as u64;
            if file.by_ref().take(want).read_to_end(&mut tail).is_ok() {
                assert_eq!(tail.as_slice(), &head[half..]);
            }
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(fs) = VirtualFileSystem::from_bytes(utils::cap(data).to_vec()) else {
        return;
    };
    walk(&fs, "", 0);
    let _ = fs.open("does/not/exist");
});
