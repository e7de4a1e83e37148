//! Menu-driven interactive loop over a [`FileManager`].
//!
//! Reads one selection and its arguments per iteration, runs exactly one
//! operation and prints the outcome. Operation errors are rendered and the
//! loop continues; only I/O errors on the terminal itself end the session.

use std::io::{self, BufRead, Write};
use std::ops::ControlFlow;

use fileman_platform::{PermissionOutcome, PermissionSpec, PlatformKind};
use tracing::debug;

use crate::config::SessionConfig;
use crate::manager::{FileManager, FileManagerError};

/// Line that ends multi-line content entry.
const CONTENT_TERMINATOR: &str = ".";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Create,
    Delete,
    Read,
    Write,
    SetPermissions,
    ChangeDirectory,
    List,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::Create),
            "2" => Some(MenuChoice::Delete),
            "3" => Some(MenuChoice::Read),
            "4" => Some(MenuChoice::Write),
            "5" => Some(MenuChoice::SetPermissions),
            "6" => Some(MenuChoice::ChangeDirectory),
            "7" => Some(MenuChoice::List),
            "8" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

enum ModeInput {
    Eof,
    Blank,
    Invalid,
    Mode(PermissionSpec),
}

const MENU: &str = "\n--- File System Menu ---
1. Create File
2. Delete File
3. Read File
4. Write File
5. Set Permissions
6. Change Directory
7. List Directory
8. Exit";

pub struct Session<R, W> {
    manager: FileManager,
    config: SessionConfig,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(manager: FileManager, config: SessionConfig, input: R, output: W) -> Self {
        Self {
            manager,
            config,
            input,
            output,
        }
    }

    pub fn manager(&self) -> &FileManager {
        &self.manager
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn run(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.output, "{}", MENU)?;
            let Some(choice) = self.prompt("Enter your choice (1-8): ")? else {
                break;
            };

            let flow = match MenuChoice::parse(&choice) {
                Some(MenuChoice::Exit) => ControlFlow::Break(()),
                Some(choice) => {
                    debug!("menu choice: {:?}", choice);
                    self.dispatch(choice)?
                }
                None => {
                    writeln!(self.output, "Invalid choice. Please try again.")?;
                    ControlFlow::Continue(())
                }
            };

            if flow.is_break() {
                break;
            }
        }

        writeln!(self.output, "Exiting...")?;
        self.output.flush()
    }

    fn dispatch(&mut self, choice: MenuChoice) -> io::Result<ControlFlow<()>> {
        match choice {
            MenuChoice::Create => self.create(),
            MenuChoice::Delete => self.delete(),
            MenuChoice::Read => self.read(),
            MenuChoice::Write => self.write(),
            MenuChoice::SetPermissions => self.set_permissions(),
            MenuChoice::ChangeDirectory => self.change_directory(),
            MenuChoice::List => self.list().map(|_| ControlFlow::Continue(())),
            MenuChoice::Exit => Ok(ControlFlow::Break(())),
        }
    }

    /// Print `message` and read one line. `None` at end of input.
    fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Read an octal mode, printing the parse error if there is one.
    fn read_mode(&mut self, message: &str) -> io::Result<ModeInput> {
        let Some(text) = self.prompt(message)? else {
            return Ok(ModeInput::Eof);
        };
        if text.trim().is_empty() {
            return Ok(ModeInput::Blank);
        }
        match text.parse::<PermissionSpec>() {
            Ok(spec) => Ok(ModeInput::Mode(spec)),
            Err(e) => {
                writeln!(self.output, "Error: {}", e)?;
                Ok(ModeInput::Invalid)
            }
        }
    }

    fn create(&mut self) -> io::Result<ControlFlow<()>> {
        let Some(name) = self.prompt("Enter the filename: ")? else {
            return Ok(ControlFlow::Break(()));
        };

        // Modes only mean something where they are applied
        let ask_mode =
            self.manager.platform() == PlatformKind::Posix && self.config.ask_mode_on_create;
        let spec = if ask_mode {
            match self.read_mode(
                "Enter the permissions (in octal format, e.g., 644; blank for default): ",
            )? {
                ModeInput::Eof => return Ok(ControlFlow::Break(())),
                ModeInput::Invalid => return Ok(ControlFlow::Continue(())),
                ModeInput::Blank => None,
                ModeInput::Mode(spec) => Some(spec),
            }
        } else {
            None
        };

        match self.manager.create_file(&name, spec) {
            Ok(created) => {
                writeln!(self.output, "File '{}' created successfully.", name)?;
                match created.permissions {
                    Some(Ok(outcome)) => self.report_permissions(&name, &outcome)?,
                    Some(Err(e)) => self.report_error(&name, &FileManagerError::from(e))?,
                    None => {}
                }
            }
            Err(e) => self.report_error(&name, &e)?,
        }
        Ok(ControlFlow::Continue(()))
    }

    fn delete(&mut self) -> io::Result<ControlFlow<()>> {
        let Some(name) = self.prompt("Enter the filename: ")? else {
            return Ok(ControlFlow::Break(()));
        };
        match self.manager.delete_file(&name) {
            Ok(()) => writeln!(self.output, "File '{}' deleted successfully.", name)?,
            Err(e) => self.report_error(&name, &e)?,
        }
        Ok(ControlFlow::Continue(()))
    }

    fn read(&mut self) -> io::Result<ControlFlow<()>> {
        let Some(name) = self.prompt("Enter the filename: ")? else {
            return Ok(ControlFlow::Break(()));
        };
        match self.manager.read_file(&name) {
            Ok(content) => {
                writeln!(self.output, "--- Content of '{}' ---", name)?;
                writeln!(self.output, "{}", content)?;
            }
            Err(e) => self.report_error(&name, &e)?,
        }
        Ok(ControlFlow::Continue(()))
    }

    fn write(&mut self) -> io::Result<ControlFlow<()>> {
        let Some(name) = self.prompt("Enter the filename: ")? else {
            return Ok(ControlFlow::Break(()));
        };

        // Don't collect content for a file that isn't there
        if !self.manager.resolve(&name).exists() {
            let path = self.manager.resolve(&name);
            self.report_error(&name, &FileManagerError::NotFound(path))?;
            return Ok(ControlFlow::Continue(()));
        }

        writeln!(self.output, "--- Writing content to '{}' ---", name)?;
        writeln!(
            self.output,
            "Enter the content (finish with a line containing only '{}'):",
            CONTENT_TERMINATOR
        )?;

        let mut lines = Vec::new();
        let mut eof = false;
        loop {
            match self.prompt("")? {
                Some(line) if line == CONTENT_TERMINATOR => break,
                Some(line) => lines.push(line),
                None => {
                    eof = true;
                    break;
                }
            }
        }

        match self.manager.write_file(&name, &lines.join("\n")) {
            Ok(()) => writeln!(self.output, "Content written successfully to '{}'.", name)?,
            Err(e) => self.report_error(&name, &e)?,
        }

        Ok(if eof {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        })
    }

    fn set_permissions(&mut self) -> io::Result<ControlFlow<()>> {
        let Some(name) = self.prompt("Enter the filename: ")? else {
            return Ok(ControlFlow::Break(()));
        };
        let spec = match self.read_mode("Enter the permissions (in octal format, e.g., 644): ")? {
            ModeInput::Eof => return Ok(ControlFlow::Break(())),
            ModeInput::Mode(spec) => spec,
            ModeInput::Blank => {
                writeln!(self.output, "Error: a permission value is required.")?;
                return Ok(ControlFlow::Continue(()));
            }
            ModeInput::Invalid => return Ok(ControlFlow::Continue(())),
        };

        match self.manager.set_permissions(&name, spec) {
            Ok(outcome) => self.report_permissions(&name, &outcome)?,
            Err(e) => self.report_error(&name, &e)?,
        }
        Ok(ControlFlow::Continue(()))
    }

    fn change_directory(&mut self) -> io::Result<ControlFlow<()>> {
        let Some(dir) = self.prompt("Enter the new directory: ")? else {
            return Ok(ControlFlow::Break(()));
        };
        match self.manager.change_directory(&dir) {
            Ok(cwd) => {
                let cwd = cwd.display().to_string();
                writeln!(self.output, "Current directory changed to '{}'.", cwd)?;
            }
            Err(e) => self.report_error(&dir, &e)?,
        }
        Ok(ControlFlow::Continue(()))
    }

    fn list(&mut self) -> io::Result<()> {
        let entries = match self.manager.list_directory() {
            Ok(entries) => entries,
            Err(e) => return writeln!(self.output, "Error: {}", e),
        };

        writeln!(
            self.output,
            "--- Contents of '{}' ---",
            self.manager.cwd().display()
        )?;
        for entry in entries {
            let suffix = if entry.is_dir { "/" } else { "" };
            writeln!(self.output, "{}{}\tOwner: {}", entry.name, suffix, entry.owner)?;
        }
        Ok(())
    }

    fn report_permissions(&mut self, name: &str, outcome: &PermissionOutcome) -> io::Result<()> {
        match outcome {
            PermissionOutcome::Applied(_) => {
                writeln!(self.output, "Permissions set successfully for '{}'.", name)
            }
            PermissionOutcome::OwnerReported(owner) => {
                writeln!(self.output, "Owner: {}", owner)?;
                writeln!(
                    self.output,
                    "Note: numeric permissions are not applied on this platform; only the owner is reported."
                )
            }
        }
    }

    fn report_error(&mut self, name: &str, err: &FileManagerError) -> io::Result<()> {
        match err {
            FileManagerError::AlreadyExists(_) => {
                writeln!(self.output, "Error: File '{}' already exists.", name)
            }
            FileManagerError::NotFound(_) => {
                writeln!(self.output, "Error: File '{}' does not exist.", name)
            }
            FileManagerError::NotADirectory(_) => {
                writeln!(self.output, "Error: Directory '{}' does not exist.", name)
            }
            FileManagerError::PermissionChangeFailed(e) => {
                writeln!(self.output, "Failed to set permissions for '{}': {}", name, e)
            }
            FileManagerError::Io { .. } => writeln!(self.output, "Error: {}", err),
        }
    }
}
