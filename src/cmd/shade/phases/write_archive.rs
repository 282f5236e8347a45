use {
    crate::cmd::shade::{
        Pipeline,
        error::{Error, Result},
        model::Archive,
        phases::ShadingPhase,
        report::print_diagnostics,
    },
    serde_json::json,
    sha2::{Digest, Sha256},
    std::{
        collections::BTreeMap,
        fs::{self, File},
        io::{self, BufReader, BufWriter, Read, Write},
        path::Path,
    },
};

/// Serializes the merged entry list into the final artifact.
#[derive(Debug, Default)]
pub struct WriteArchive;

impl ShadingPhase for WriteArchive {}

/// Container format marker, bumped on layout changes.
const MAGIC: &[u8; 5] = b"SPAK\x01";

impl Pipeline<'_, WriteArchive> {
    pub fn write_archive(self) -> Result<()> {
        let dst = self.ctx.dst.clone();
        let write_err = |source: io::Error| Error::Write {
            path: dst.clone(),
            source,
        };

        let dir = dst.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| write_err(e))?;

        let file_name = dst
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                write_err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "artifact path has no file name",
                ))
            })?
            .to_string();
        let tmp = dst.with_file_name(format!("{file_name}.tmp"));
        let manifest = dst.with_file_name(format!("{file_name}.checksum.json"));
        let manifest_tmp = dst.with_file_name(format!("{file_name}.checksum.json.tmp"));

        // Stage everything in the destination directory first; the final
        // paths only ever receive complete files via rename.
        let staged = write_entries(&tmp, &self.ctx.archive).and_then(|()| {
            let json = checksum_manifest(&self.ctx.archive, &tmp)?;
            fs::write(&manifest_tmp, json)
        });
        if let Err(source) = staged {
            let _ = fs::remove_file(&tmp);
            let _ = fs::remove_file(&manifest_tmp);
            return Err(write_err(source));
        }
        if let Err(source) = fs::rename(&tmp, &dst) {
            let _ = fs::remove_file(&tmp);
            let _ = fs::remove_file(&manifest_tmp);
            return Err(write_err(source));
        }
        if let Err(source) = fs::rename(&manifest_tmp, &manifest) {
            let _ = fs::remove_file(&manifest_tmp);
            let _ = fs::remove_file(&dst);
            return Err(write_err(source));
        }

        println!(
            "Artifact {:?} written successfully to {:?}",
            self.ctx.config.artifact_name(),
            dst
        );
        print_diagnostics(&self.ctx.diagnostics);
        Ok(())
    }
}

/// Entry layout: magic, big-endian entry count, then per entry a
/// length-prefixed UTF-8 path and a length-prefixed content blob. Entries
/// arrive sorted by path, so identical inputs produce identical bytes.
fn write_entries(path: &Path, archive: &Archive) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(MAGIC)?;
    let count = u32::try_from(archive.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many archive entries"))?;
    out.write_all(&count.to_be_bytes())?;
    for entry in archive.entries() {
        let path_bytes = entry.path.as_bytes();
        let path_len = u16::try_from(path_bytes.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("entry path too long: {:?}", entry.path),
            )
        })?;
        out.write_all(&path_len.to_be_bytes())?;
        out.write_all(path_bytes)?;
        out.write_all(&(entry.content.len() as u64).to_be_bytes())?;
        out.write_all(&entry.content)?;
    }
    out.flush()
}

/// Per-entry digests plus the digest of the artifact file itself, as a
/// pretty-printed JSON document written beside the artifact.
fn checksum_manifest(archive: &Archive, artifact: &Path) -> io::Result<String> {
    let mut files = BTreeMap::new();
    for entry in archive.entries() {
        let mut hasher = Sha256::new();
        hasher.update(&entry.content);
        files.insert(entry.path.clone(), format!("{:x}", hasher.finalize()));
    }

    let mut file = BufReader::new(File::open(artifact)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let json_obj = json!({
        "files": files,
        "artifact": format!("{:x}", hasher.finalize()),
    });
    Ok(serde_json::to_string_pretty(&json_obj)?)
}
