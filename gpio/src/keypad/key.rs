use crate::keypad::MatrixPosition;

/// Represents the keys on a 4x4 keypad.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KeypadKey {
    /// The `1` key.
    Key1,
    /// The `2` key.
    Key2,
    /// The `3` key.
    Key3,
    /// The `4` key.
    Key4,
    /// The `5` key.
    Key5,
    /// The `6` key.
    Key6,
    /// The `7` key.
    Key7,
    /// The `8` key.
    Key8,
    /// The `9` key.
    Key9,
    /// The `0` key.
    Key0,
    /// The `*` key.
    KeyAsterisk,
    /// The `#` key.
    KeyHash,
    /// The `A` key.
    KeyA,
    /// The `B` key.
    KeyB,
    /// The `C` key.
    KeyC,
    /// The `D` key.
    KeyD,
}

use KeypadKey::*;

/// The key layout, indexed `[row][col]`.
const KEYS: [[KeypadKey; 4]; 4] = [
    [ Key1, Key2, Key3, KeyA, ],
    [ Key4, Key5, Key6, KeyB, ],
    [ Key7, Key8, Key9, KeyC, ],
    [ KeyAsterisk, Key0, KeyHash, KeyD, ],
];

impl KeypadKey {
    /// Looks up the key wired at `pos`.
    pub const fn from_position(pos: MatrixPosition) -> KeypadKey {
        KEYS[pos.row()][pos.col()]
    }

    /// Finds the key that types `c`, if there is one on the keypad.
    pub fn from_char(c: char) -> Option<KeypadKey> {
        KEYS.iter()
            .flatten()
            .copied()
            .find(|key| key.to_char() == c)
    }

    /// Converts the [KeypadKey] to its corresponding character.
    pub const fn to_char(self) -> char {
        match self {
            Key1 => '1',
            Key2 => '2',
            Key3 => '3',
            Key4 => '4',
            Key5 => '5',
            Key6 => '6',
            Key7 => '7',
            Key8 => '8',
            Key9 => '9',
            Key0 => '0',
            KeyAsterisk => '*',
            KeyHash => '#',
            KeyA => 'A',
            KeyB => 'B',
            KeyC => 'C',
            KeyD => 'D',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_at(row: usize, col: usize) -> char {
        KeypadKey::from_position(MatrixPosition::new(row, col).unwrap()).to_char()
    }

    #[test]
    fn layout_matches_keypad_print() {
        let rows: Vec<String> = (0..4)
            .map(|row| (0..4).map(|col| char_at(row, col)).collect())
            .collect();
        assert_eq!(rows, ["123A", "456B", "789C", "*0#D"]);
    }

    #[test]
    fn from_char_finds_every_key() {
        for pos in MatrixPosition::scan_order() {
            let key = KeypadKey::from_position(pos);
            assert_eq!(KeypadKey::from_char(key.to_char()), Some(key));
        }
        assert_eq!(KeypadKey::from_char('E'), None);
        assert_eq!(KeypadKey::from_char('a'), None);
    }
}
