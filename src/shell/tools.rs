//! Wrappers for the external tools a product build drives.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::BuildContext;
use crate::error::{BuildError, Result};

use super::command::{capture, display_command, run, split_args, CommandOptions, CommandResult};

/// Name of the npm executable on this platform.
pub fn npm_executable() -> &'static str {
    if cfg!(windows) {
        "npm.cmd"
    } else {
        "npm"
    }
}

fn options(ctx: &BuildContext, cwd: &Path) -> CommandOptions {
    CommandOptions::in_dir(cwd)
        .with_env(&ctx.env)
        .quiet(ctx.options.quiet)
}

/// Run `npm <cmd>` in `cwd`.
pub async fn npm(ctx: &BuildContext, cwd: &Path, cmd: &str) -> Result<CommandResult> {
    let cmd = if cmd.is_empty() { "install" } else { cmd };
    info!("{} running npm {}", cwd.display(), cmd);
    run(npm_executable(), &split_args(cmd), &options(ctx, cwd)).await
}

/// Run `docker` with pre-split arguments.
pub async fn docker_args(ctx: &BuildContext, cwd: &Path, args: Vec<String>) -> Result<CommandResult> {
    info!("{} running {}", cwd.display(), display_command("docker", &args));
    run("docker", &args, &options(ctx, cwd)).await
}

/// Run `pip <cmd>` in `cwd`.
pub async fn pip(ctx: &BuildContext, cwd: &Path, cmd: &str) -> Result<CommandResult> {
    info!("{} running pip {}", cwd.display(), cmd);
    run("pip", &split_args(cmd), &options(ctx, cwd)).await
}

/// Run the scaffolding generator `phovea:<name>` in `cwd`.
pub async fn generator(
    ctx: &BuildContext,
    cwd: &Path,
    name: &str,
    args: &[String],
) -> Result<CommandResult> {
    let mut all = vec![format!("phovea:{}", name)];
    all.extend(args.iter().cloned());
    info!("{} running {} phovea:{}", cwd.display(), ctx.generator, name);
    run(&ctx.generator, &all, &options(ctx, cwd)).await
}

/// Shallow-clone `url` at `branch` into `cwd/dir`.
pub async fn git_clone(
    ctx: &BuildContext,
    cwd: &Path,
    url: &str,
    branch: &str,
    dir: &str,
) -> Result<CommandResult> {
    let args: Vec<String> = ["clone", "--depth", "1", "--branch", branch, url, dir]
        .iter()
        .map(|s| s.to_string())
        .collect();
    info!("{} cloning {} ({}) into {}", cwd.display(), dir, branch, dir);
    run("git", &args, &options(ctx, cwd)).await
}

/// Gzip everything `reader` yields into the file at `target`.
///
/// Compression runs on the blocking pool; the async side only moves chunks.
/// A failed write removes the partial file. Returns the uncompressed size.
pub async fn gzip_to_file<R>(mut reader: R, target: &Path) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(8);
    let path = target.to_path_buf();
    let writer = tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::create(&path)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        while let Some(chunk) = rx.blocking_recv() {
            encoder.write_all(&chunk)?;
        }
        encoder.finish()?.flush()?;
        Ok(())
    });

    let mut total = 0u64;
    let read = async {
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total += n as u64;
            // a closed channel means the writer failed; its error is reported below
            if tx.send(buf[..n].to_vec()).await.is_err() {
                break;
            }
        }
        Ok::<(), BuildError>(())
    }
    .await;
    drop(tx);

    let written = match writer.await {
        Ok(result) => result,
        Err(err) => Err(anyhow::Error::new(err).context("gzip writer aborted").into()),
    };
    let outcome = read.and(written).map(|()| total);
    if outcome.is_err() {
        remove_partial(target).await;
    }
    outcome
}

async fn remove_partial(target: &Path) {
    if let Err(err) = tokio::fs::remove_file(target).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!("could not remove {}: {}", target.display(), err);
        }
    }
}

/// Write `docker save <image>` gzip-compressed to `target`.
pub async fn docker_save(ctx: &BuildContext, image: &str, target: &Path) -> Result<()> {
    info!("running docker save {} | gzip > {}", image, target.display());
    let command = format!("docker save {}", image);

    let mut child = Command::new("docker")
        .args(["save", image])
        .envs(&ctx.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(if ctx.options.quiet {
            Stdio::null()
        } else {
            Stdio::inherit()
        })
        .spawn()
        .map_err(|_| BuildError::CommandFailed {
            command: command.clone(),
            code: None,
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("docker save stdout not captured"))?;

    let saved = gzip_to_file(stdout, target).await;
    let status = child.wait().await?;
    saved?;
    if !status.success() {
        remove_partial(target).await;
        return Err(BuildError::CommandFailed {
            command,
            code: status.code(),
        });
    }
    Ok(())
}

/// Images whose `repository:tag` mentions `product`.
pub fn matching_images<'a>(listing: &'a str, product: &str) -> Vec<&'a str> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.contains(product))
        .collect()
}

/// Remove old images of `product`. Failures are logged, never returned.
pub async fn docker_remove_images(ctx: &BuildContext, product: &str) {
    info!("remove docker images matching {}", product);
    let list_args = split_args("images --format {{.Repository}}:{{.Tag}}");
    let opts = CommandOptions::default().with_env(&ctx.env);

    let listing = match capture("docker", &list_args, &opts).await {
        Ok(result) if result.success => result.stdout,
        Ok(result) => {
            warn!("docker images exited with {:?}, but continuing", result.exit_code);
            return;
        }
        Err(err) => {
            warn!("{}, but continuing", err);
            return;
        }
    };

    let images = matching_images(&listing, product);
    if images.is_empty() {
        return;
    }

    let mut args = vec!["rmi".to_string()];
    args.extend(images.iter().map(|s| s.to_string()));
    if let Err(err) = run("docker", &args, &opts.quiet(ctx.options.quiet)).await {
        warn!("{}, but continuing", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npm_executable_matches_platform() {
        if cfg!(windows) {
            assert_eq!(npm_executable(), "npm.cmd");
        } else {
            assert_eq!(npm_executable(), "npm");
        }
    }

    #[test]
    fn matching_images_filters_by_product() {
        let listing = "demo/web:1.0.0\nother:latest\n\ndemo:20240101-000000\n";
        assert_eq!(
            matching_images(listing, "demo"),
            vec!["demo/web:1.0.0", "demo:20240101-000000"]
        );
        assert!(matching_images(listing, "missing").is_empty());
    }

    struct BrokenPipe {
        sent: bool,
    }

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.sent {
                return std::task::Poll::Ready(Err(std::io::Error::other("docker died")));
            }
            self.sent = true;
            buf.put_slice(b"layer.tar");
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn gzip_to_file_compresses_stream() {
        use std::io::Read;

        let temp = tempfile::TempDir::new().unwrap();
        let target = temp.path().join("web_image.tar.gz");
        let payload = b"manifest.json layer.tar ".repeat(4096);

        let size = gzip_to_file(payload.as_slice(), &target).await.unwrap();
        assert_eq!(size, payload.len() as u64);

        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(std::fs::File::open(&target).unwrap())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, payload);
    }

    #[tokio::test]
    async fn gzip_to_file_removes_partial_output() {
        let temp = tempfile::TempDir::new().unwrap();
        let target = temp.path().join("api_image.tar.gz");

        let err = gzip_to_file(BrokenPipe { sent: false }, &target).await.unwrap_err();

        assert!(err.to_string().contains("docker died"));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn gzip_to_file_reports_unwritable_target() {
        let temp = tempfile::TempDir::new().unwrap();
        let target = temp.path().join("missing/dir/image.tar.gz");

        assert!(gzip_to_file(b"data".as_slice(), &target).await.is_err());
        assert!(!target.exists());
    }
}
