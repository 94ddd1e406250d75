use filebuffer::FileBuffer;
use rgunzip::decompress_gzip::{decompress_gzip_body, read_gzip_header};
use rgunzip::streams::deflate_slice_input::DeflateSliceInput;
use rgunzip::streams::deflate_window_output::DeflateWindowOutput;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use structopt::StructOpt;

const CHUNK_SIZE: usize = 1024 * 512;

#[derive(StructOpt)]
struct GunzipParams {
    /// The gzip file to decompress.
    input: PathBuf,
    /// Destination path; defaults to the name stored in the member, then
    /// to the input with its .gz suffix removed.
    output: Option<PathBuf>,
    /// Decode and verify without writing an output file.
    #[structopt(short)]
    simulate: bool,
}

fn main() {
    let params = GunzipParams::from_args();
    if let Err(message) = run(&params) {
        eprintln!("rgunzip: {}", message);
        std::process::exit(1);
    }
}

fn run(params: &GunzipParams) -> Result<(), String> {
    let buffer = FileBuffer::open(&params.input)
        .map_err(|err| format!("{}: {}", params.input.display(), err))?;
    let mut input = DeflateSliceInput::new(&buffer);

    let header = read_gzip_header(&mut input).map_err(|err| err.to_string())?;

    if params.simulate {
        let mut output = DeflateWindowOutput::new(|_| Ok(()), CHUNK_SIZE);
        decompress_gzip_body(&mut input, &mut output).map_err(|err| err.to_string())?;
        return Ok(());
    }

    let output_path = resolve_output_path(params, header.file_name.as_deref())?;

    /* Never clobber an existing file. */
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&output_path)
        .map_err(|err| format!("{}: {}", output_path.display(), err))?;

    {
        let mut writer = BufWriter::new(&file);
        {
            let mut output =
                DeflateWindowOutput::new(|chunk| writer.write_all(chunk), CHUNK_SIZE);
            decompress_gzip_body(&mut input, &mut output).map_err(|err| err.to_string())?;
        }
        writer
            .flush()
            .map_err(|err| format!("{}: {}", output_path.display(), err))?;
    }

    /* MTIME of zero means the member carries no timestamp. */
    if header.mtime != 0 {
        let mtime = UNIX_EPOCH + Duration::from_secs(u64::from(header.mtime));
        file.set_modified(mtime)
            .map_err(|err| format!("{}: {}", output_path.display(), err))?;
    }

    Ok(())
}

fn resolve_output_path(
    params: &GunzipParams,
    stored_name: Option<&str>,
) -> Result<PathBuf, String> {
    if let Some(path) = &params.output {
        return Ok(path.clone());
    }

    /* Only the file-name component of FNAME is honored. */
    if let Some(name) = stored_name {
        if let Some(file_name) = Path::new(name).file_name() {
            return Ok(params.input.with_file_name(file_name));
        }
    }

    if params.input.extension().map_or(false, |ext| ext == "gz") {
        return Ok(params.input.with_extension(""));
    }

    Err(format!(
        "{}: cannot derive an output name (no stored name and no .gz suffix)",
        params.input.display()
    ))
}
