use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use device::{read_to_end, write_all, AccessMode, FileOperations, OpenFile, ScullDevices};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

pub const HELP: &str = "\
commands:
  open <minor> <r|w|rw>   open a device, prints a descriptor
  write <fd> <text>       write text at the descriptor's position
  read <fd> <count>       read up to count bytes
  seek <fd> <offset>      move the descriptor's position
  close <fd>              release a descriptor
  stat <minor>            show a device's store statistics
  files                   list open descriptors
  help                    show this text
  quit                    leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open { minor: u32, mode: AccessMode },
    Write { fd: u32, data: String },
    Read { fd: u32, count: usize },
    Seek { fd: u32, offset: u64 },
    Close { fd: u32 },
    Stat { minor: u32 },
    Files,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> anyhow::Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim_start()),
            None => (line, ""),
        };
        let mut args = rest.split_whitespace();

        let command = match name {
            "open" => {
                let minor = parse_arg(args.next(), "minor")?;
                let mode = match args.next() {
                    Some("r") => AccessMode::ReadOnly,
                    Some("w") => AccessMode::WriteOnly,
                    Some("rw") | None => AccessMode::ReadWrite,
                    Some(other) => bail!("unknown access mode '{}'", other),
                };
                Command::Open { minor, mode }
            }
            "write" => {
                let (fd, data) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow!("usage: write <fd> <text>"))?;
                Command::Write {
                    fd: parse_arg(Some(fd), "fd")?,
                    data: data.to_string(),
                }
            }
            "read" => Command::Read {
                fd: parse_arg(args.next(), "fd")?,
                count: parse_arg(args.next(), "count")?,
            },
            "seek" => Command::Seek {
                fd: parse_arg(args.next(), "fd")?,
                offset: parse_arg(args.next(), "offset")?,
            },
            "close" => Command::Close {
                fd: parse_arg(args.next(), "fd")?,
            },
            "stat" => Command::Stat {
                minor: parse_arg(args.next(), "minor")?,
            },
            "files" => Command::Files,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command '{}'", other),
        };

        Ok(Some(command))
    }
}

fn parse_arg<T>(arg: Option<&str>, name: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let arg = arg.ok_or_else(|| anyhow!("missing {}", name))?;
    arg.parse::<T>()
        .with_context(|| format!("invalid {} '{}'", name, arg))
}

/// Line-oriented front end over the scull file operations, standing in for
/// user programs opening `/dev/scullN`.
pub struct Shell {
    devices: Arc<ScullDevices>,
    files: HashMap<u32, OpenFile>,
    next_fd: u32,
}

impl Shell {
    pub fn new(devices: Arc<ScullDevices>) -> Self {
        Self {
            devices,
            files: HashMap::new(),
            next_fd: 3,
        }
    }

    pub fn open_files(&self) -> usize {
        self.files.len()
    }

    pub async fn execute(&mut self, command: Command) -> anyhow::Result<String> {
        match command {
            Command::Open { minor, mode } => {
                let file = self.devices.open(minor, mode).await?;
                let fd = self.next_fd;
                self.next_fd += 1;
                self.files.insert(fd, file);
                Ok(format!("fd {}", fd))
            }
            Command::Write { fd, data } => {
                let file = lookup(&mut self.files, fd)?;
                let written = write_all(self.devices.as_ref(), file, data.as_bytes()).await?;
                Ok(format!("wrote {} bytes", written))
            }
            Command::Read { fd, count } => {
                let file = lookup(&mut self.files, fd)?;
                let data = read_to_end(self.devices.as_ref(), file, count).await?;
                Ok(format!(
                    "read {} bytes: {}",
                    data.len(),
                    String::from_utf8_lossy(&data)
                ))
            }
            Command::Seek { fd, offset } => {
                lookup(&mut self.files, fd)?.seek(offset);
                Ok(format!("fd {} at {}", fd, offset))
            }
            Command::Close { fd } => {
                let file = self
                    .files
                    .remove(&fd)
                    .ok_or_else(|| anyhow!("bad descriptor {}", fd))?;
                self.devices.release(file).await?;
                Ok(format!("closed fd {}", fd))
            }
            Command::Stat { minor } => {
                let stats = self.devices.stat(minor).await?;
                Ok(serde_json::to_string(&stats)?)
            }
            Command::Files => {
                let mut fds: Vec<&u32> = self.files.keys().collect();
                fds.sort();
                let listing: Vec<String> = fds
                    .into_iter()
                    .map(|fd| {
                        let file = &self.files[fd];
                        format!(
                            "fd {} minor {} {:?} pos {} session {} opened {}",
                            fd,
                            file.minor,
                            file.mode,
                            file.pos,
                            file.id,
                            file.opened_at.to_rfc3339()
                        )
                    })
                    .collect();
                Ok(listing.join("\n"))
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
        }
    }

    /// Runs commands from `input` until `quit` or end of input, then
    /// releases every descriptor still open.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let reply = match Command::parse(&line) {
                Ok(None) => continue,
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.execute(command).await,
                Err(e) => Err(e),
            };

            match reply {
                Ok(text) => output.write_all(format!("{}\n", text).as_bytes()).await?,
                Err(e) => {
                    warn!("command failed: {:#}", e);
                    output
                        .write_all(format!("error: {:#}\n", e).as_bytes())
                        .await?
                }
            }
            output.flush().await?;
        }

        self.close_all().await
    }

    pub async fn close_all(&mut self) -> anyhow::Result<()> {
        for (_, file) in self.files.drain() {
            self.devices.release(file).await?;
        }
        Ok(())
    }
}

fn lookup(files: &mut HashMap<u32, OpenFile>, fd: u32) -> anyhow::Result<&mut OpenFile> {
    files
        .get_mut(&fd)
        .ok_or_else(|| anyhow!("bad descriptor {}", fd))
}
