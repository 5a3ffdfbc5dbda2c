#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub fn chapter_markup(paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("    <p>{p}</p>\n"))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\">\n  <body>\n{body}  </body>\n</html>\n"
    )
}

/// Write an unpacked book: one chapter file per entry under `OEBPS/`.
pub fn write_book(root: &Path, chapters: &[(&str, Vec<&str>)]) {
    fs::create_dir_all(root.join("OEBPS")).expect("create OEBPS");
    for (name, paragraphs) in chapters {
        fs::write(root.join("OEBPS").join(name), chapter_markup(paragraphs)).expect("write chapter");
    }
}

/// Write a minimal EPUB container holding the given entries.
pub fn write_epub(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let mut writer = ZipWriter::new(File::create(path).expect("create epub"));
    writer
        .start_file("mimetype", SimpleFileOptions::default())
        .expect("start mimetype");
    writer
        .write_all(b"application/epub+zip")
        .expect("write mimetype");
    for (name, body) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(body).expect("write entry");
    }
    writer.finish().expect("finish epub");
}
