/*
 * Line Editor
 *
 * Reads one line from the console descriptor for the shell, echoing as it
 * goes. Handles just enough of a terminal for a serial prompt:
 *
 * - CR or LF ends the line (the terminator is not stored)
 * - DEL erases the last character
 * - ESC [ <x> sequences (arrows, and ESC [ 1..6 ~ keys) are swallowed
 * - a full buffer ends the line
 */

use crate::config::{STDIN, STDOUT};
use crate::io::FioTable;

const ESC: u8 = 0x1B;
const DEL: u8 = 0x7F;

fn getc<const N: usize>(table: &FioTable<N>) -> Option<u8> {
    let mut byte = [0u8; 1];
    match table.read(STDIN, &mut byte) {
        Ok(1) => Some(byte[0]),
        _ => None,
    }
}

fn echo<const N: usize>(table: &FioTable<N>, bytes: &[u8]) {
    let _ = table.write(STDOUT, bytes);
}

/// Read a line from stdin into `buf`, echoing to stdout.
///
/// Stores at most `buf.len() - 1` bytes and NUL-terminates them, so the
/// buffer can be handed on as a C string. Returns the number of bytes
/// stored. Stops early if stdin stops producing bytes.
pub fn read_line<const N: usize>(table: &FioTable<N>, buf: &mut [u8]) -> usize {
    let max = buf.len().saturating_sub(1);
    let mut count = 0;

    while count < max {
        let Some(byte) = getc(table) else {
            break;
        };

        match byte {
            b'\r' | b'\n' => break,
            DEL => {
                if count > 0 {
                    count -= 1;
                    echo(table, b"\x08 \x08");
                }
            }
            ESC => match getc(table) {
                Some(b'[') => {
                    if let Some(b'1'..=b'6') = getc(table) {
                        getc(table);
                    }
                }
                Some(other) => {
                    buf[count] = other;
                    count += 1;
                    echo(table, &[other]);
                }
                None => break,
            },
            _ => {
                buf[count] = byte;
                count += 1;
                echo(table, &[byte]);
            }
        }
    }

    if let Some(end) = buf.get_mut(count) {
        *end = 0;
    }
    echo(table, b"\n\r");
    count
}
