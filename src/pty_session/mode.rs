//! Line discipline and window size applied to every new pseudoterminal.
//!
//! The values here are fixed. Changing any of them changes what users see
//! (echo, which keys raise signals), so they are kept bit-for-bit stable.

use std::io;
use std::mem;

const fn ctrl(key: u8) -> u8 {
    key & 0x1f
}

const DEL: u8 = 0x7f;

/// Special characters the slave line discipline reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlChars {
    pub start: u8,
    pub stop: u8,
    pub erase: u8,
    pub kill: u8,
    pub interrupt: u8,
    pub quit: u8,
    pub eof: u8,
    pub suspend: u8,
    pub word_erase: u8,
    pub reprint: u8,
}

/// Terminal mode for the slave side. Every field not listed is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalMode {
    pub input_flags: libc::tcflag_t,
    pub output_flags: libc::tcflag_t,
    pub control_flags: libc::tcflag_t,
    pub local_flags: libc::tcflag_t,
    /// Symbolic line rate; a PTY has no real baud rate.
    pub speed: libc::speed_t,
    pub control_chars: ControlChars,
}

static STANDARD_MODE: TerminalMode = TerminalMode {
    input_flags: libc::IXON | libc::IXOFF,
    output_flags: libc::OPOST | libc::ONLCR,
    control_flags: libc::CS8 | libc::CREAD | libc::CLOCAL,
    local_flags: libc::ICANON
        | libc::ISIG
        | libc::ECHO
        | libc::ECHOE
        | libc::ECHOK
        | libc::ECHOKE
        | libc::ECHOCTL,
    speed: libc::B9600,
    control_chars: ControlChars {
        start: ctrl(b'Q'),
        stop: ctrl(b'S'),
        erase: DEL,
        kill: ctrl(b'U'),
        interrupt: ctrl(b'C'),
        quit: ctrl(b'\\'),
        eof: ctrl(b'D'),
        suspend: ctrl(b'Z'),
        word_erase: ctrl(b'W'),
        reprint: ctrl(b'R'),
    },
};

impl TerminalMode {
    /// The process-wide default mode: canonical input, echo, XON/XOFF, 8-bit, CRLF output.
    pub fn standard() -> &'static TerminalMode {
        &STANDARD_MODE
    }

    /// Byte a host writes to signal end of input to a canonical-mode reader.
    pub fn eof_char(&self) -> u8 {
        self.control_chars.eof
    }

    /// Build the `termios` handed to `openpty`.
    pub fn to_termios(&self) -> io::Result<libc::termios> {
        // SAFETY: termios is a plain C struct; all-zero is the "everything disabled" baseline.
        let mut tio: libc::termios = unsafe { mem::zeroed() };
        tio.c_iflag = self.input_flags;
        tio.c_oflag = self.output_flags;
        tio.c_cflag = self.control_flags;
        tio.c_lflag = self.local_flags;

        let cc = &self.control_chars;
        tio.c_cc[libc::VSTART] = cc.start;
        tio.c_cc[libc::VSTOP] = cc.stop;
        tio.c_cc[libc::VERASE] = cc.erase;
        tio.c_cc[libc::VKILL] = cc.kill;
        tio.c_cc[libc::VINTR] = cc.interrupt;
        tio.c_cc[libc::VQUIT] = cc.quit;
        tio.c_cc[libc::VEOF] = cc.eof;
        tio.c_cc[libc::VSUSP] = cc.suspend;
        tio.c_cc[libc::VWERASE] = cc.word_erase;
        tio.c_cc[libc::VREPRINT] = cc.reprint;

        // On Linux this folds the rate into c_cflag exactly like OR-ing in B9600;
        // elsewhere it fills the dedicated speed fields.
        // SAFETY: tio is a valid, initialized termios owned by this frame.
        unsafe {
            if libc::cfsetispeed(&mut tio, self.speed) != 0
                || libc::cfsetospeed(&mut tio, self.speed) != 0
            {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(tio)
    }
}

/// Initial PTY dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

impl WindowSize {
    pub const DEFAULT: WindowSize = WindowSize { rows: 24, cols: 80 };

    pub fn to_winsize(self) -> libc::winsize {
        libc::winsize {
            ws_row: self.rows,
            ws_col: self.cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}
