#![no_main]

use libfuzzer_sys::fuzz_target;
use mdkw::maildir::MaildirInfo;

fuzz_target!(|data: &[u8]| {
    if let Ok(name) = std::str::from_utf8(data) {
        let info = MaildirInfo::parse(name);
        // Formatting and reparsing yields the same flags
        let again = MaildirInfo::parse(&info.to_filename());
        assert_eq!(info.flags(), again.flags());
    }
});
