use std::{collections::HashSet, fmt, ops};

use crate::Flag;

/// Represents the list of flags.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Flags(pub HashSet<Flag>);

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut glue = "";

        for flag in &self.0 {
            write!(f, "{}{}", glue, flag)?;
            glue = " ";
        }

        Ok(())
    }
}

impl ops::Deref for Flags {
    type Target = HashSet<Flag>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ops::DerefMut for Flags {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<T: IntoIterator<Item = Flag>>(iter: T) -> Self {
        let mut flags = Flags::default();
        flags.extend(iter);
        flags
    }
}
