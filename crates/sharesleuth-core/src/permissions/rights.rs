/// Access rights as an explicit flag set.
///
/// Each named bit is one capability; composites such as [`AccessRights::MODIFY`]
/// are unions of those bits. "More permissive" is defined as a strict superset.
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessRights(u32);

impl AccessRights {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(1 << 0);
    pub const WRITE: Self = Self(1 << 1);
    pub const APPEND: Self = Self(1 << 2);
    pub const EXECUTE: Self = Self(1 << 3);
    pub const DELETE: Self = Self(1 << 4);
    /// Delete children regardless of their own ACL (`FILE_DELETE_CHILD`).
    pub const DELETE_SUBTREE: Self = Self(1 << 5);
    pub const READ_ATTRIBUTES: Self = Self(1 << 6);
    pub const WRITE_ATTRIBUTES: Self = Self(1 << 7);
    pub const READ_EXTENDED_ATTRIBUTES: Self = Self(1 << 8);
    pub const WRITE_EXTENDED_ATTRIBUTES: Self = Self(1 << 9);
    pub const READ_PERMISSIONS: Self = Self(1 << 10);
    pub const CHANGE_PERMISSIONS: Self = Self(1 << 11);
    pub const TAKE_OWNERSHIP: Self = Self(1 << 12);
    pub const SYNCHRONIZE: Self = Self(1 << 13);

    /// Read & execute as shown in the Windows security dialog.
    pub const READ_AND_EXECUTE: Self = Self(
        Self::READ.0
            | Self::EXECUTE.0
            | Self::READ_ATTRIBUTES.0
            | Self::READ_EXTENDED_ATTRIBUTES.0
            | Self::READ_PERMISSIONS.0
            | Self::SYNCHRONIZE.0,
    );

    pub const MODIFY: Self = Self(
        Self::READ_AND_EXECUTE.0
            | Self::WRITE.0
            | Self::APPEND.0
            | Self::WRITE_ATTRIBUTES.0
            | Self::WRITE_EXTENDED_ATTRIBUTES.0
            | Self::DELETE.0,
    );

    pub const FULL_CONTROL: Self = Self(
        Self::MODIFY.0 | Self::DELETE_SUBTREE.0 | Self::CHANGE_PERMISSIONS.0 | Self::TAKE_OWNERSHIP.0,
    );

    /// Any of these makes an entry `Read/Write`.
    pub const WRITE_CAPABLE: Self = Self(
        Self::WRITE.0
            | Self::APPEND.0
            | Self::DELETE.0
            | Self::DELETE_SUBTREE.0
            | Self::WRITE_ATTRIBUTES.0
            | Self::WRITE_EXTENDED_ATTRIBUTES.0
            | Self::CHANGE_PERMISSIONS.0
            | Self::TAKE_OWNERSHIP.0,
    );

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// `true` if `self` grants everything `other` grants, and more.
    #[inline]
    pub const fn is_strict_superset_of(self, other: Self) -> bool {
        self.contains(other) && self.0 != other.0
    }

    #[inline]
    pub fn can_write(self) -> bool {
        self.intersects(Self::WRITE_CAPABLE)
    }

    /// Translate a Windows file access mask, expanding generic rights.
    pub fn from_windows_mask(mask: u32) -> Self {
        const FILE_READ_DATA: u32 = 0x0001;
        const FILE_WRITE_DATA: u32 = 0x0002;
        const FILE_APPEND_DATA: u32 = 0x0004;
        const FILE_READ_EA: u32 = 0x0008;
        const FILE_WRITE_EA: u32 = 0x0010;
        const FILE_EXECUTE: u32 = 0x0020;
        const FILE_DELETE_CHILD: u32 = 0x0040;
        const FILE_READ_ATTRIBUTES: u32 = 0x0080;
        const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
        const DELETE: u32 = 0x0001_0000;
        const READ_CONTROL: u32 = 0x0002_0000;
        const WRITE_DAC: u32 = 0x0004_0000;
        const WRITE_OWNER: u32 = 0x0008_0000;
        const SYNCHRONIZE: u32 = 0x0010_0000;
        const GENERIC_ALL: u32 = 0x1000_0000;
        const GENERIC_EXECUTE: u32 = 0x2000_0000;
        const GENERIC_WRITE: u32 = 0x4000_0000;
        const GENERIC_READ: u32 = 0x8000_0000;

        if mask & GENERIC_ALL != 0 {
            return Self::FULL_CONTROL;
        }

        let table: [(u32, Self); 14] = [
            (FILE_READ_DATA, Self::READ),
            (FILE_WRITE_DATA, Self::WRITE),
            (FILE_APPEND_DATA, Self::APPEND),
            (FILE_READ_EA, Self::READ_EXTENDED_ATTRIBUTES),
            (FILE_WRITE_EA, Self::WRITE_EXTENDED_ATTRIBUTES),
            (FILE_EXECUTE, Self::EXECUTE),
            (FILE_DELETE_CHILD, Self::DELETE_SUBTREE),
            (FILE_READ_ATTRIBUTES, Self::READ_ATTRIBUTES),
            (FILE_WRITE_ATTRIBUTES, Self::WRITE_ATTRIBUTES),
            (DELETE, Self::DELETE),
            (READ_CONTROL, Self::READ_PERMISSIONS),
            (WRITE_DAC, Self::CHANGE_PERMISSIONS),
            (WRITE_OWNER, Self::TAKE_OWNERSHIP),
            (SYNCHRONIZE, Self::SYNCHRONIZE),
        ];

        let mut rights = Self::NONE;
        for (bit, right) in table {
            if mask & bit != 0 {
                rights |= right;
            }
        }
        if mask & GENERIC_READ != 0 {
            rights |= Self::READ
                | Self::READ_ATTRIBUTES
                | Self::READ_EXTENDED_ATTRIBUTES
                | Self::READ_PERMISSIONS
                | Self::SYNCHRONIZE;
        }
        if mask & GENERIC_WRITE != 0 {
            rights |= Self::WRITE
                | Self::APPEND
                | Self::WRITE_ATTRIBUTES
                | Self::WRITE_EXTENDED_ATTRIBUTES
                | Self::READ_PERMISSIONS
                | Self::SYNCHRONIZE;
        }
        if mask & GENERIC_EXECUTE != 0 {
            rights |= Self::EXECUTE
                | Self::READ_ATTRIBUTES
                | Self::READ_PERMISSIONS
                | Self::SYNCHRONIZE;
        }
        rights
    }
}

impl BitOr for AccessRights {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AccessRights {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for AccessRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::FULL_CONTROL => return f.write_str("AccessRights(FullControl)"),
            Self::MODIFY => return f.write_str("AccessRights(Modify)"),
            Self::READ_AND_EXECUTE => return f.write_str("AccessRights(ReadAndExecute)"),
            _ => {}
        }
        write!(f, "AccessRights({:#06x})", self.0)
    }
}
