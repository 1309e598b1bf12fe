pub(crate) mod desc;
