use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use bstr::ByteSlice;
use rand::distributions::{Alphanumeric, DistString};
use tracing::{debug, warn};

use super::lockfile::Lockfile;
use super::{check_ref_name, ObjectSource};
use crate::error::{Error, Result};
use crate::object::{ObjectKind, RawObject};
use crate::oid::{Oid, HEX_LEN};

/// A git directory on the local filesystem, driven through the `git` binary.
pub struct GitRepo {
    git_dir: PathBuf,
    git: PathBuf,
}

impl GitRepo {
    /// Opens `path`, preferring `path/.git` when it is a directory.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_git(path, "git")
    }

    pub fn with_git(path: impl AsRef<Path>, git: impl Into<PathBuf>) -> Self {
        let path = path.as_ref();
        let dot_git = path.join(".git");
        let git_dir = if dot_git.is_dir() {
            dot_git
        } else {
            path.to_path_buf()
        };
        Self {
            git_dir,
            git: git.into(),
        }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.git);
        cmd.arg("--git-dir").arg(&self.git_dir);
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = self.command().args(args).stdin(Stdio::null()).output()?;
        if !output.status.success() {
            return Err(Error::Source(format!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                output.stderr.to_str_lossy().trim()
            )));
        }
        Ok(output.stdout)
    }

    /// Whether `rev` names an object. False for an unborn `HEAD`.
    fn resolves(&self, rev: &str) -> Result<bool> {
        let status = self
            .command()
            .args(["rev-parse", "--verify", "--quiet", rev])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        Ok(status.success())
    }

    /// Runs `git rev-list --objects` and keeps the id column.
    ///
    /// A revision that does not resolve lists nothing.
    fn rev_list(&self, rev: &str) -> Result<Vec<Oid>> {
        if rev.starts_with('-') && rev != "--all" {
            return Err(Error::Source(format!("refusing revision {rev:?}")));
        }
        if rev != "--all" && !self.resolves(rev)? {
            debug!(git_dir = %self.git_dir.display(), rev, "revision does not resolve");
            return Ok(Vec::new());
        }
        let stdout = self.run(&["rev-list", "--objects", rev])?;
        let mut ids = Vec::new();
        for line in ByteSlice::lines(stdout.as_slice()) {
            let id = line
                .get(..HEX_LEN)
                .and_then(Oid::from_hex)
                .ok_or_else(|| unexpected_output("rev-list", line))?;
            ids.push(id);
        }
        debug!(git_dir = %self.git_dir.display(), rev, count = ids.len(), "listed objects");
        Ok(ids)
    }
}

impl ObjectSource for GitRepo {
    fn list_ids(&self, rev: &str) -> Result<Vec<Oid>> {
        self.rev_list(rev)
    }

    fn list_all_ids(&self) -> Result<Vec<Oid>> {
        self.rev_list("--all")
    }

    fn read_objects(&self, ids: &[Oid]) -> Result<Vec<RawObject>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut child = self
            .command()
            .args(["cat-file", "--batch"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Source("cat-file stdin unavailable".to_owned()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Source("cat-file stdout unavailable".to_owned()))?;

        let mut input = String::with_capacity(ids.len() * (HEX_LEN + 1));
        for id in ids {
            input.push_str(&id.to_string());
            input.push('\n');
        }
        // Fed from another thread so a full stdout pipe cannot stall us.
        let feeder = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let mut reader = BufReader::new(stdout);
        let parsed = ids
            .iter()
            .map(|id| read_batch_entry(&mut reader, id))
            .collect::<Result<Vec<_>>>();

        // Drain so git can exit even when parsing stopped early.
        let _ = io::copy(&mut reader, &mut io::sink());
        let fed = feeder
            .join()
            .map_err(|_| Error::Source("cat-file feeder panicked".to_owned()))?;
        let output = child.wait_with_output()?;

        let objects = parsed?;
        fed?;
        if !output.status.success() {
            return Err(Error::Source(format!(
                "git cat-file exited with {}: {}",
                output.status,
                output.stderr.to_str_lossy().trim()
            )));
        }
        debug!(git_dir = %self.git_dir.display(), count = objects.len(), "read objects");
        Ok(objects)
    }

    fn has_id(&self, id: &Oid) -> bool {
        match self
            .command()
            .args(["cat-file", "-e", &id.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => status.success(),
            Err(e) => {
                warn!(
                    git_dir = %self.git_dir.display(),
                    error = %e,
                    "failed to run git cat-file -e"
                );
                false
            }
        }
    }

    fn write_raw_object(&self, id: &Oid, zcontent: &[u8]) -> Result<()> {
        let hex = id.to_string();
        let (group, rest) = hex.split_at(2);
        let group_path = self.git_dir.join("objects").join(group);
        let object_path = group_path.join(rest);

        if let Ok(true) = fs::exists(&object_path) {
            return Ok(());
        }

        fs::create_dir_all(&group_path)?;
        install_file(&group_path, &object_path, zcontent)
    }

    fn write_ref(&self, name: &str, id: &Oid) -> Result<()> {
        let name = check_ref_name(name)?;
        let path = self.git_dir.join(&name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut lock = Lockfile::new(path);
        if !lock.hold_for_update()? {
            return Err(Error::Source(format!(
                "unable to lock {}: already locked",
                lock.lock_path().display()
            )));
        }
        lock.write(format!("{id}\n").as_bytes())?;
        lock.commit()?;
        debug!(git_dir = %self.git_dir.display(), name = %name, %id, "updated ref");
        Ok(())
    }
}

/// Reads one `<oid> <kind> <size>\n<body>\n` answer of `git cat-file --batch`.
fn read_batch_entry(reader: &mut impl BufRead, expected: &Oid) -> Result<RawObject> {
    let mut header = Vec::new();
    if reader.read_until(b'\n', &mut header)? == 0 {
        return Err(Error::Source(format!(
            "cat-file ended before answering {expected}"
        )));
    }
    let header = header.strip_suffix(b"\n").unwrap_or(&header);

    let fields: Vec<&[u8]> = header.split_str(" ").collect();
    let [oid, kind, size] = fields.as_slice() else {
        return Err(unexpected_output("cat-file", header));
    };
    let (Some(oid), Some(kind), Some(size)) = (
        Oid::from_hex(oid),
        ObjectKind::from_bytes(kind),
        size.to_str().ok().and_then(|s| s.parse::<usize>().ok()),
    ) else {
        return Err(unexpected_output("cat-file", header));
    };
    if oid != *expected {
        return Err(Error::Source(format!(
            "cat-file answered {oid} when asked for {expected}"
        )));
    }

    let mut body = vec![0; size + 1];
    reader.read_exact(&mut body)?;
    if body.pop() != Some(b'\n') {
        return Err(unexpected_output("cat-file", header));
    }

    let object = RawObject::new(kind, body);
    if object.oid() != expected {
        return Err(Error::HashMismatch {
            expected: *expected,
            actual: *object.oid(),
        });
    }
    Ok(object)
}

fn unexpected_output(command: &str, line: &[u8]) -> Error {
    Error::Source(format!(
        "unexpected git {command} output: {:?}",
        line.as_bstr()
    ))
}

/// Writes `content` to a fresh read-only temp file in `dir`, then renames it
/// to `target`. The temp file does not survive a failed step.
fn install_file(dir: &Path, target: &Path, content: &[u8]) -> Result<()> {
    let temp_path = dir.join(generate_temp_name());
    let file = File::create_new(&temp_path)?;

    let installed = fill_read_only(file, content).and_then(|()| fs::rename(&temp_path, target));
    if let Err(e) = installed {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            warn!(path = %temp_path.display(), error = %cleanup, "failed to remove temp file");
        }
        return Err(e.into());
    }
    Ok(())
}

fn fill_read_only(mut file: File, content: &[u8]) -> io::Result<()> {
    file.write_all(content)?;
    let mut permissions = file.metadata()?.permissions();
    permissions.set_readonly(true);
    file.set_permissions(permissions)
}

fn generate_temp_name() -> String {
    let suffix = Alphanumeric.sample_string(&mut rand::thread_rng(), 6);
    format!("tmp_obj_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn batch_entries_are_verified() {
        let blob = RawObject::new(ObjectKind::Blob, b"hello\n".to_vec());
        let mut answer = format!("{} blob 6\n", blob.oid()).into_bytes();
        answer.extend_from_slice(b"hello\n\n");

        let read = read_batch_entry(&mut Cursor::new(&answer), blob.oid()).unwrap();
        assert_eq!(read, blob);

        let other = RawObject::new(ObjectKind::Blob, b"other".to_vec());
        let mut tampered = format!("{} blob 6\n", other.oid()).into_bytes();
        tampered.extend_from_slice(b"hello\n\n");
        assert!(matches!(
            read_batch_entry(&mut Cursor::new(&tampered), other.oid()),
            Err(Error::HashMismatch { .. })
        ));
    }

    #[test]
    fn missing_answer_is_a_source_error() {
        let blob = RawObject::new(ObjectKind::Blob, b"hello\n".to_vec());
        let answer = format!("{} missing\n", blob.oid());
        assert!(matches!(
            read_batch_entry(&mut Cursor::new(answer.as_bytes()), blob.oid()),
            Err(Error::Source(_))
        ));
        assert!(matches!(
            read_batch_entry(&mut Cursor::new(b""), blob.oid()),
            Err(Error::Source(_))
        ));
    }

    #[test]
    fn failed_install_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("no-such-dir").join("object");

        assert!(matches!(
            install_file(dir.path(), &target, b"content"),
            Err(Error::Io(_))
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn opens_work_tree_or_bare_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(GitRepo::open(dir.path()).git_dir(), dir.path());

        fs::create_dir(dir.path().join(".git")).unwrap();
        assert_eq!(GitRepo::open(dir.path()).git_dir(), dir.path().join(".git"));
    }

    #[test]
    fn raw_objects_and_refs_land_in_the_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GitRepo::open(dir.path());
        let blob = RawObject::new(ObjectKind::Blob, b"hello\n".to_vec());
        let hex = blob.oid().to_string();

        repo.write_raw_object(blob.oid(), &blob.encode()).unwrap();
        repo.write_raw_object(blob.oid(), &blob.encode()).unwrap();
        let path = dir.path().join("objects").join(&hex[..2]).join(&hex[2..]);
        assert_eq!(RawObject::decode(&fs::read(path).unwrap()).unwrap(), blob);

        repo.write_ref("refs/tags/x", blob.oid()).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("refs/tags/x")).unwrap(),
            format!("{hex}\n")
        );
        assert!(matches!(
            repo.write_ref("../escape", blob.oid()),
            Err(Error::UnsafeRefName(_))
        ));
    }
}
