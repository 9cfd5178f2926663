//! Gzip-transparent file I/O: readers and writers shared by the molecule
//! loader and the alignment record writer.
//!
//! A `.gz` extension spawns a decoding thread feeding an anonymous pipe
//! rather than buffering the whole decompressed file, and output
//! similarly supports a plain file, a gzip-compressed file, or stdout
//! behind one enum.

pub mod molecule_loader;

use crate::utils::whichever::define_whichever;
use flate2::{Compression, read::MultiGzDecoder, write::GzEncoder};
use std::{
    fs::File,
    io::{BufReader, BufWriter, PipeReader, Stdout, stdout},
    path::Path,
    thread::{self, JoinHandle},
};

define_whichever! {
    #[doc="An enum for the different acceptable input types"]
    pub(crate) enum ReadFileZip {
        #[doc="A reader for a regular uncompressed file"]
        File(File),
        #[doc="A reader for a gzip compressed file, using a thread and an anonymous pipe for decoding"]
        Zipped(PipeReader),
    }

    impl Read for ReadFileZip {}
}

define_whichever! {
    #[doc="An enum for the different acceptable output types"]
    pub(crate) enum WriteFileZipStdout {
        #[doc="A writer for a regular uncompressed file"]
        File(BufWriter<File>),
        #[doc="A writer for a gzip compressed file"]
        Zipped(GzEncoder<BufWriter<File>>),
        #[doc="A writer for uncompressed data to stdout"]
        Stdout(BufWriter<Stdout>),
    }

    impl Write for WriteFileZipStdout {}
}

/// The handle for a thread used for IO.
pub(crate) type IoThread = JoinHandle<std::io::Result<()>>;

/// Opens a molecule map file for reading, transparently decompressing it if
/// its extension is `gz`. The returned reader is line-buffered; the decoding
/// thread (if any) must be joined with [`finalize_io_thread`] once reading is
/// done.
///
/// ## Errors
///
/// `path` must exist, and if gzipped, creation of the decoding pipe must
/// succeed.
pub(crate) fn open_text_file<P: AsRef<Path>>(path: P) -> std::io::Result<(BufReader<ReadFileZip>, Option<IoThread>)> {
    let file = File::open(&path)?;
    let is_gz = path.as_ref().extension().is_some_and(|ext| ext == "gz");

    if is_gz {
        let (pipe, thread) = spawn_decoder(path)?;
        Ok((BufReader::new(ReadFileZip::Zipped(pipe)), Some(thread)))
    } else {
        Ok((BufReader::new(ReadFileZip::File(file)), None))
    }
}

/// Spawns a thread that decodes the input file using [`MultiGzDecoder`],
/// streaming the decompressed bytes to the returned [`PipeReader`].
///
/// ## Errors
///
/// `file_path` must exist, and creation of the pipe must succeed.
fn spawn_decoder(file_path: impl AsRef<Path>) -> std::io::Result<(PipeReader, IoThread)> {
    let (reader, mut writer) = std::io::pipe()?;
    let mut decoder = MultiGzDecoder::new(File::open(file_path)?);

    let thread = thread::spawn(move || -> std::io::Result<()> {
        std::io::copy(&mut decoder, &mut writer)?;
        Ok(())
    });

    Ok((reader, thread))
}

/// Joins `thread`, if any, propagating any I/O error it encountered.
pub(crate) fn finalize_io_thread(thread: Option<IoThread>) -> std::io::Result<()> {
    if let Some(thread) = thread {
        thread.join().unwrap()?;
    }
    Ok(())
}

/// Creates a [`WriteFileZipStdout`], using `path` to determine whether a
/// regular file, gzip-compressed file, or stdout should be used.
///
/// ## Errors
///
/// Creation of `path` must succeed, if a path is specified.
pub(crate) fn create_writer<P: AsRef<Path>>(path: Option<P>) -> std::io::Result<WriteFileZipStdout> {
    let writer = match path {
        Some(ref p) => {
            let is_gz = p.as_ref().extension().is_some_and(|ext| ext == "gz");
            let file = File::create(p)?;
            let buf_writer = BufWriter::new(file);

            if is_gz {
                WriteFileZipStdout::Zipped(GzEncoder::new(buf_writer, Compression::default()))
            } else {
                WriteFileZipStdout::File(buf_writer)
            }
        }
        None => WriteFileZipStdout::Stdout(BufWriter::new(stdout())),
    };

    Ok(writer)
}
