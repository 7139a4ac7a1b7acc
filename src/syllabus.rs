//! Engineering syllabus catalog
//!
//! Static lookup tables mapping an engineering branch and academic year to the
//! subjects usually taught, plus the curriculum summary used when prompting
//! for a branch roadmap.

use lazy_static::lazy_static;
use serde::Serialize;

/// Curriculum context used for branches missing from the catalog
pub const GENERIC_CURRICULUM: &str =
    "Advanced Mathematics, core engineering fundamentals, and project management.";

/// Subjects for one branch, indexed by academic year (1-4)
#[derive(Debug, Clone, Serialize)]
pub struct BranchSyllabus {
    pub branch: &'static str,
    pub curriculum: &'static str,
    pub years: [&'static [&'static str]; 4],
}

impl BranchSyllabus {
    /// Subjects taught in the given year, or an empty slice if the year is out of range
    pub fn subjects_for_year(&self, year: u8) -> &'static [&'static str] {
        match year {
            1..=4 => self.years[(year - 1) as usize],
            _ => &[],
        }
    }
}

const FIRST_YEAR_CORE: &[&str] = &[
    "Engineering Mathematics I",
    "Engineering Physics",
    "Engineering Chemistry",
    "Basic Electrical Engineering",
    "Programming for Problem Solving",
    "Engineering Graphics",
];

lazy_static! {
    /// The full catalog, in display order
    pub static ref ENGINEERING_SYLLABUS: Vec<BranchSyllabus> = vec![
        BranchSyllabus {
            branch: "Computer Science & Engineering",
            curriculum: "DSA, OS, DBMS, Computer Networks, Discrete Math, System Design, Web Technologies.",
            years: [
                FIRST_YEAR_CORE,
                &[
                    "Data Structures",
                    "Discrete Mathematics",
                    "Digital Logic Design",
                    "Object Oriented Programming",
                    "Computer Organization",
                ],
                &[
                    "Design and Analysis of Algorithms",
                    "Operating Systems",
                    "Database Management Systems",
                    "Computer Networks",
                    "Theory of Computation",
                ],
                &[
                    "Compiler Design",
                    "System Design",
                    "Web Technologies",
                    "Machine Learning",
                    "Distributed Systems",
                ],
            ],
        },
        BranchSyllabus {
            branch: "Electronics & Communication",
            curriculum: "Analog Circuits, Digital Electronics, Signals & Systems, Control Systems, Microprocessors, Communication Theory.",
            years: [
                FIRST_YEAR_CORE,
                &[
                    "Network Analysis",
                    "Analog Circuits",
                    "Digital Electronics",
                    "Signals and Systems",
                    "Electronic Devices",
                ],
                &[
                    "Control Systems",
                    "Microprocessors and Microcontrollers",
                    "Analog Communication",
                    "Electromagnetic Theory",
                    "Linear Integrated Circuits",
                ],
                &[
                    "Digital Communication",
                    "VLSI Design",
                    "Embedded Systems",
                    "Wireless Communication",
                    "Digital Signal Processing",
                ],
            ],
        },
        BranchSyllabus {
            branch: "Mechanical Engineering",
            curriculum: "Thermodynamics, Fluid Mechanics, Strength of Materials, Theory of Machines, Manufacturing, Heat Transfer.",
            years: [
                FIRST_YEAR_CORE,
                &[
                    "Engineering Mechanics",
                    "Thermodynamics",
                    "Strength of Materials",
                    "Material Science",
                    "Manufacturing Processes",
                ],
                &[
                    "Fluid Mechanics",
                    "Theory of Machines",
                    "Heat Transfer",
                    "Machine Design",
                    "Applied Thermodynamics",
                ],
                &[
                    "Refrigeration and Air Conditioning",
                    "Finite Element Analysis",
                    "Automobile Engineering",
                    "Industrial Engineering",
                    "CAD/CAM",
                ],
            ],
        },
        BranchSyllabus {
            branch: "Electrical & Electronics Engineering",
            curriculum: "Power Systems, Electrical Machines, Network Theory, Control Systems, Power Electronics.",
            years: [
                FIRST_YEAR_CORE,
                &[
                    "Network Theory",
                    "Electrical Machines I",
                    "Analog Electronics",
                    "Electromagnetic Fields",
                    "Electrical Measurements",
                ],
                &[
                    "Electrical Machines II",
                    "Power Systems I",
                    "Control Systems",
                    "Power Electronics",
                    "Digital Electronics",
                ],
                &[
                    "Power Systems II",
                    "Switchgear and Protection",
                    "Electric Drives",
                    "High Voltage Engineering",
                    "Renewable Energy Systems",
                ],
            ],
        },
        BranchSyllabus {
            branch: "Civil Engineering",
            curriculum: "Structural Analysis, Geotechnical Engg, Fluid Mechanics, Surveying, Transportation, RCC Design.",
            years: [
                FIRST_YEAR_CORE,
                &[
                    "Surveying",
                    "Building Materials",
                    "Strength of Materials",
                    "Fluid Mechanics",
                    "Engineering Geology",
                ],
                &[
                    "Structural Analysis",
                    "Geotechnical Engineering",
                    "RCC Design",
                    "Transportation Engineering",
                    "Hydrology",
                ],
                &[
                    "Steel Structures",
                    "Environmental Engineering",
                    "Construction Management",
                    "Foundation Engineering",
                    "Estimation and Costing",
                ],
            ],
        },
        BranchSyllabus {
            branch: "Data Science & AI",
            curriculum: "Linear Algebra, Probability/Stats, Machine Learning, Deep Learning, SQL, Big Data, Python for Data Science.",
            years: [
                FIRST_YEAR_CORE,
                &[
                    "Linear Algebra",
                    "Probability and Statistics",
                    "Python for Data Science",
                    "Data Structures",
                    "Database Systems and SQL",
                ],
                &[
                    "Machine Learning",
                    "Data Mining",
                    "Optimization Techniques",
                    "Big Data Analytics",
                    "Data Visualization",
                ],
                &[
                    "Deep Learning",
                    "Natural Language Processing",
                    "Computer Vision",
                    "Reinforcement Learning",
                    "MLOps",
                ],
            ],
        },
    ];
}

/// Finds a branch by exact name, falling back to a case-insensitive match
pub fn find_branch(branch: &str) -> Option<&'static BranchSyllabus> {
    let wanted = branch.trim();
    ENGINEERING_SYLLABUS
        .iter()
        .find(|b| b.branch == wanted)
        .or_else(|| {
            ENGINEERING_SYLLABUS
                .iter()
                .find(|b| b.branch.eq_ignore_ascii_case(wanted))
        })
}

/// Returns the catalog subjects for a branch and year, empty when unknown
pub fn subjects_for(branch: &str, year: u8) -> Vec<String> {
    find_branch(branch)
        .map(|b| {
            b.subjects_for_year(year)
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// All branch names in catalog order
pub fn branch_names() -> Vec<String> {
    ENGINEERING_SYLLABUS
        .iter()
        .map(|b| b.branch.to_string())
        .collect()
}

/// Curriculum summary for prompting, with a generic fallback for unknown branches
pub fn curriculum_context(branch: &str) -> &'static str {
    find_branch(branch)
        .map(|b| b.curriculum)
        .unwrap_or(GENERIC_CURRICULUM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects_for_known_branch_and_year() {
        let subjects = subjects_for("Mechanical Engineering", 2);
        assert!(subjects.contains(&"Thermodynamics".to_string()));
        assert_eq!(subjects.len(), 5);
    }

    #[test]
    fn test_branch_lookup_is_case_insensitive() {
        assert!(find_branch("civil engineering").is_some());
        assert!(find_branch("Underwater Basket Weaving").is_none());
    }

    #[test]
    fn test_out_of_range_year_is_empty() {
        assert!(subjects_for("Civil Engineering", 0).is_empty());
        assert!(subjects_for("Civil Engineering", 5).is_empty());
        assert!(subjects_for("Unknown", 1).is_empty());
    }

    #[test]
    fn test_curriculum_context_fallback() {
        assert!(curriculum_context("Computer Science & Engineering").contains("DSA"));
        assert_eq!(curriculum_context("Astrology"), GENERIC_CURRICULUM);
    }

    #[test]
    fn test_branch_names_in_catalog_order() {
        let names = branch_names();
        assert_eq!(names.len(), 6);
        assert_eq!(names[0], "Computer Science & Engineering");
    }
}
