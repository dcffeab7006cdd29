use crate::domain::Partition;
use crate::keywords::ClassKeywords;

pub const UNDEFINED: &str = "undefined";
pub const UNRESOLVED: &str = "unresolved";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub class_names: Vec<String>,
    pub classes: Vec<Partition>,
    pub unresolved: Partition,
    pub undefined: Partition,
}

impl Classification {
    pub fn class(&self, name: &str) -> Option<&Partition> {
        self.classes.iter().find(|partition| partition.name() == name)
    }

    pub fn classified_len(&self) -> usize {
        self.classes.iter().map(Partition::len).sum()
    }

    pub fn total_len(&self) -> usize {
        self.classified_len() + self.unresolved.len() + self.undefined.len()
    }
}

pub fn classify_runs(included: Partition, fields: &[usize], classes: &ClassKeywords) -> Classification {
    let class_names = classes.names();
    let mut partitions: Vec<Partition> = class_names.iter().map(Partition::new).collect();
    let mut unresolved = Partition::new(UNRESOLVED);
    let mut undefined = Partition::new(UNDEFINED);

    for mut run in included.into_runs() {
        let mut first_match = None;
        let mut matches = 0usize;
        for (index, class) in classes.iter().enumerate() {
            let keyword = class.find_in(&run, fields).map(str::to_string);
            match keyword {
                Some(keyword) => {
                    matches += 1;
                    first_match.get_or_insert(index);
                    run.push_identified(class.name(), &keyword);
                }
                None => run.push_identified(class.name(), ""),
            }
        }

        match (matches, first_match) {
            (1, Some(index)) => partitions[index].push(run),
            (0, _) => undefined.push(run),
            _ => unresolved.push(run),
        }
    }

    Classification {
        class_names,
        classes: partitions,
        unresolved,
        undefined,
    }
}
